pub mod blobs;
pub mod files;
pub mod health_check;
pub mod query;
pub mod statements;
pub mod transactions;
pub mod volumes;

/// Generates an absolute url to the path based on the application address.
pub fn url_for(path: impl AsRef<str>) -> String {
    use crate::config::settings;

    format!(
        "http://{}{}",
        settings().application.address(),
        path.as_ref()
    )
}
