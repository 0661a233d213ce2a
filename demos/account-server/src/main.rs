//! A runnable account role with one seeded account.
//!
//! ```text
//! cargo run -p account-server -- 127.0.0.1:9601
//! ```
//!
//! Log in as `demo` / `demo1234`; selecting the character in slot 0 hands
//! out a ticket for the game server on `localhost:9604`.

use realmgate::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

fn seed_storage() -> Result<MemoryStorage, StorageError> {
    let mut storage = MemoryStorage::new();

    let mut demo = Account::new("demo", "demo1234", "demo@example.net");
    demo.characters.push(Character {
        name: "Wanderer".into(),
        gender: 0,
        hair_style: 3,
        hair_color: 5,
        level: 1,
        experience: 0,
        correction_points: 0,
        money: 0,
        attributes: [10; 6],
        map: MapId(1),
        position: Position::new(512, 512),
    });
    let id = storage.add_account(demo)?;
    tracing::info!(account = %id, "seeded demo account");

    Ok(storage)
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let bind = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("0.0.0.0:{}", realmgate::config::DEFAULT_ACCOUNT_PORT));
    let maps = MapTable::new().with_map(MapId(1), ServerAddress::new("localhost", 9604));

    let server = AccountServerBuilder::new()
        .bind(&bind)
        .build(seed_storage()?, maps)
        .await?;

    server.run().await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
