pub mod notifier;
pub mod provider;
pub mod repositories;
