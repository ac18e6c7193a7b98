use std::sync::Arc;

use rocket::*;

mod api_key;
mod config;
mod cors;
mod leaderboard;
mod routes;
mod score;
mod store;
mod tree;
#[cfg(test)]
mod tests;

use api_key::{KeyVerifier, StaticKey};
use config::{Config, ConfigError};
use cors::{Cors, OriginPolicy};
use store::ScoreStore;
use tree::{Tree, TreeError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to open the score tree: {0}")]
    Tree(#[from] TreeError),
    #[error("server error: {0}")]
    Server(#[from] rocket::Error),
}

#[rocket::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    // Load the configuration
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // Connect to the score tree
    let tree = tree::connect(&config.database).await?;

    build_rocket(&config, tree).launch().await?;
    Ok(())
}

/// Assembles the server around an already opened score tree.
pub fn build_rocket(config: &Config, tree: Arc<dyn Tree>) -> Rocket<Build> {
    let store = ScoreStore::new(tree, config.root.clone());
    let verifier: Box<dyn KeyVerifier> = Box::new(StaticKey::new(config.api_key.clone()));
    let origins = OriginPolicy::new(config.allowed_origins.clone());

    rocket::build()
        .mount(
            "/",
            routes![
                routes::health,
                routes::list_scores,
                routes::submit_score,
                cors::preflight
            ],
        )
        .register("/", catchers![routes::not_found, routes::default_catcher])
        .attach(Cors)
        .manage(store)
        .manage(verifier)
        .manage(origins)
}
