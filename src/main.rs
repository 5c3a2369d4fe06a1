//! TGP Viewer: drives the Model 1 geometry pipeline with a synthetic scene
//!
//! Controls:
//! - W/S/A/D: move the debug camera, Q/E: yaw
//! - Tab: toggle wireframe
//! - F12: save a PNG snapshot (desktop only)

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod demo;

use log::{info, warn};
use macroquad::prelude::*;
use tgp_raster::logging::{init_logging, DEFAULT_FILTER};
use tgp_raster::rasterizer::{HEIGHT, WIDTH};
use tgp_raster::{Framebuffer, RenderConfig, Tgp};

/// Optional renderer settings in the working directory
#[cfg(not(target_arch = "wasm32"))]
const CONFIG_PATH: &str = "tgp.ron";

const CAMERA_SPEED: f32 = 3.0;
const YAW_SPEED: f32 = 1.5;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("TGP Viewer v{}", VERSION),
        window_width: WIDTH as i32 * 2,
        window_height: HEIGHT as i32 * 2,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn load_render_config() -> RenderConfig {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if std::path::Path::new(CONFIG_PATH).exists() {
            match tgp_raster::load_config(CONFIG_PATH) {
                Ok(config) => {
                    info!("loaded {}", CONFIG_PATH);
                    return config;
                }
                Err(e) => warn!("ignoring {}: {}", CONFIG_PATH, e),
            }
        }
    }
    RenderConfig::default()
}

#[macroquad::main(window_conf)]
async fn main() {
    init_logging(DEFAULT_FILTER);

    let config = load_render_config();
    let fb_w = (WIDTH as f32 * config.scale_x) as usize;
    let fb_h = (HEIGHT as f32 * config.scale_y) as usize;
    let mut fb = Framebuffer::new(fb_w.max(1), fb_h.max(1));

    let mut tgp = Tgp::new(config);
    demo::install(&mut tgp);
    // Enable list processing with hardware buffer flipping
    tgp.write_control(1, 0x1f, 0xffff);
    tgp.write_control(0, 0x04, 0xffff);

    let mut camera = tgp_raster::Vec3::default();
    let mut yaw = 0.0f32;
    let mut time = 0.0f32;

    info!("=== TGP Viewer v{} ===", VERSION);

    loop {
        let dt = get_frame_time();
        time += dt;

        if is_key_pressed(KeyCode::Tab) {
            let on = !tgp.wireframe();
            tgp.set_wireframe(on);
        }
        if is_key_down(KeyCode::Q) {
            yaw -= YAW_SPEED * dt;
        }
        if is_key_down(KeyCode::E) {
            yaw += YAW_SPEED * dt;
        }
        if is_key_down(KeyCode::W) {
            camera.z -= CAMERA_SPEED * dt;
        }
        if is_key_down(KeyCode::S) {
            camera.z += CAMERA_SPEED * dt;
        }
        if is_key_down(KeyCode::A) {
            camera.x += CAMERA_SPEED * dt;
        }
        if is_key_down(KeyCode::D) {
            camera.x -= CAMERA_SPEED * dt;
        }
        tgp.set_camera(camera, yaw);

        // Fill the back buffer; the frame boundary makes it current
        let back = tgp.current_list() ^ 1;
        tgp.write_list(back, 0, &demo::frame_list(time));
        tgp.vblank();

        fb.clear(tgp_raster::rasterizer::Color::new(16, 16, 24));
        let clip = fb.bounds();
        tgp.render(&mut fb, clip);

        #[cfg(not(target_arch = "wasm32"))]
        {
            if is_key_pressed(KeyCode::F12) {
                let path = format!("tgp-{}.png", tgp.counter());
                match fb.save_png(&path) {
                    Ok(()) => info!("saved {}", path),
                    Err(e) => warn!("snapshot failed: {}", e),
                }
            }
        }

        clear_background(Color::from_rgba(30, 30, 35, 255));

        let fb_texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.to_rgba8());
        fb_texture.set_filter(FilterMode::Nearest);

        // Letterbox at the native aspect ratio
        let scale = (screen_width() / fb.width as f32).min(screen_height() / fb.height as f32);
        let (dw, dh) = (fb.width as f32 * scale, fb.height as f32 * scale);
        draw_texture_ex(
            &fb_texture,
            (screen_width() - dw) / 2.0,
            (screen_height() - dh) / 2.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(dw, dh)),
                ..Default::default()
            },
        );

        let stats = tgp.last_stats();
        draw_text(
            &format!(
                "quads {}  points {}  dropped {}  list {}{}",
                stats.quads,
                stats.points,
                stats.dropped,
                tgp.current_list(),
                if tgp.wireframe() { "  [wire]" } else { "" }
            ),
            8.0,
            18.0,
            16.0,
            WHITE,
        );

        next_frame().await;
    }
}
