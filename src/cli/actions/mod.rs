pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        worker_id: u64,
        datacenter_id: u64,
    },
}
