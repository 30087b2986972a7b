// Server configuration options
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub company_name: String,
    pub inventory_path: PathBuf,
    // Scripts run concurrently against the company once it is bound
    pub scripts: Vec<PathBuf>,
    pub worker_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            company_name: "Hertz".to_string(),
            inventory_path: PathBuf::from("data/hertz.csv"),
            scripts: Vec::new(),
            worker_threads: 4,
        }
    }
}
