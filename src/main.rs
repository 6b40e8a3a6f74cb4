//! HONGBAO - Lucky red envelope gacha
//! CLICK, CHARGE, OPEN!

use bevy::prelude::*;
use hongbao::scene::{HongbaoPlugin, WINDOW_HEIGHT, WINDOW_WIDTH};
use hongbao::GachaConfig;

fn main() -> AppExit {
    // Load env vars
    let _ = dotenvy::dotenv();

    // Logging isn't up until the app runs, so report straight to stderr
    let config = match GachaConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return AppExit::error();
        }
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "HONGBAO - LUCKY RED ENVELOPE".into(),
                resolution: (WINDOW_WIDTH, WINDOW_HEIGHT).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(HongbaoPlugin::new(config))
        .run()
}
