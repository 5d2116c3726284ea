pub mod broadcast;
pub mod config;
pub mod error;
pub mod json;
pub mod server;
pub mod state;

pub mod models {
    pub mod event;
    pub mod session;
}

pub mod repositories {
    pub mod session;
}

pub mod services {
    pub mod chips;
}

pub mod handlers {
    pub mod chips;
    pub mod health;
    pub mod ws;
}

pub mod validation {
    pub mod chips;
}
