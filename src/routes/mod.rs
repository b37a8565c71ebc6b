pub mod export;
pub mod health;
pub mod links;
pub mod logs;
pub mod session;
pub mod store;
pub mod tester;
pub mod ws;
