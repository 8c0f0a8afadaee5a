#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod pipeline;
mod types;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::{bounded, unbounded};
use gpui::Application;
use gpui_component;

use config::RigConfig;
use pipeline::{
    Compositor, FrameRateMonitor, SensorEventSink, SensorSession, coordinate::PinholeMapper,
    sensor_from_config, start_frame_compositor,
};

fn open_sensor(config: &RigConfig, sink: SensorEventSink) -> Result<SensorSession> {
    let source = sensor_from_config(config)?;
    log::info!("opening {} sensor {}", config.sensor.label(), source.name());
    source.open(sink)
}

fn main() -> Result<()> {
    env_logger::init();

    let config = RigConfig::from_env();
    log::debug!("rig config: {config:?}");

    let (sensor_tx, sensor_rx) = bounded(config.sensor_queue_depth);
    let (control_tx, control_rx) = unbounded();
    let (output_tx, output_rx) = bounded(2);

    let session = match open_sensor(&config, SensorEventSink::new(sensor_tx)) {
        Ok(session) => Some(session),
        Err(err) => {
            log::error!("no sensor available: {err:?}");
            None
        }
    };

    let compositor = match &session {
        Some(session) => Compositor::new(
            session.geometry(),
            session.coordinate_mapper(),
            true,
            FrameRateMonitor::new(config.frame_rate_window),
        ),
        None => Compositor::new(
            (config.frame_width, config.frame_height),
            Arc::new(PinholeMapper::for_color_geometry(
                config.frame_width,
                config.frame_height,
            )),
            false,
            FrameRateMonitor::new(config.frame_rate_window),
        ),
    };
    let frame_compositor = start_frame_compositor(compositor, sensor_rx, control_rx, output_tx);

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, output_rx, control_tx, session, frame_compositor) {
                eprintln!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
