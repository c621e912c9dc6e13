/// Prints the database url gathered from the config settings files.
///
/// Useful for:
/// - export DATABASE_URL=$(cargo run --bin db_url)
/// or
/// - sqlx database setup --database-url $(cargo run --bin db_url)
fn main() {
    let settings = quadstore::config::settings();
    print!("{}", settings.database.url());
}
