mod bouncing_ball;
mod common;
mod menu;
mod player;

use std::path::Path;

use anyhow::Result;
use ember2d::{rgb, AssetLoader, AudioManager, Engine, EngineConfig};

use crate::menu::Menu;

/// Fonts tried in order when `EMBER2D_FONT` is not set.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = EngineConfig::new()
        .with_title("Ember2D Gallery")
        .with_size(800, 600)
        .with_clear_color(rgb(0x0f0f1a));

    match find_font() {
        Some(path) => config = config.with_font(path),
        None => log::warn!("No font found; set EMBER2D_FONT to a .ttf file to see text"),
    }

    let mut assets = AssetLoader::new();
    assets.insert(player::SHEET_KEY, player::generate_sheet());

    Engine::new(config)
        .with_audio(AudioManager::new())
        .with_assets(assets)
        .run(Menu)
}

fn find_font() -> Option<String> {
    if let Ok(path) = std::env::var("EMBER2D_FONT") {
        return Some(path);
    }
    FONT_CANDIDATES
        .iter()
        .find(|path| Path::new(path).exists())
        .map(|path| path.to_string())
}
