use crate::config::Config;
use crate::db::Db;

pub struct AppState {
    pub db: Db,
    pub config: Config,
}
