//! Entry point for the vehicle view.

mod sim;

use anyhow::Result;
use clap::Parser;
use geodesy::Geodetic;
use std::sync::Arc;
use vehicle_view::{
    app::App,
    config::Config,
    driver::{ChannelVehicleSource, Collaborators},
    scene::{imagery::ImageryCatalog, models::ModelCatalog, sensor::ChannelSensorSource},
    waypoint::WaypointList,
};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::debug!("{config:?}");

    // Bounded hand-off queues; producers drop updates when the render thread lags.
    let (vehicle_tx, vehicle_rx) = crossbeam_channel::bounded(64);
    let (sensor_tx, sensor_rx) = crossbeam_channel::bounded(4);
    let home = (!config.no_sim_fix)
        .then(|| Geodetic::new(config.sim_origin_lat, config.sim_origin_lon, 0.0));
    sim::spawn_vehicle(home, vehicle_tx);
    sim::spawn_sensor(sensor_tx);

    let mut imagery = ImageryCatalog::new();
    imagery.register(Box::new(sim::CheckerboardSource::satellite()));
    imagery.register(Box::new(sim::CheckerboardSource::streets()));

    let collaborators = Collaborators {
        vehicle: Box::new(ChannelVehicleSource::new(vehicle_rx)),
        waypoints: Box::new(WaypointList::new()),
        sensor: Some(Box::new(ChannelSensorSource::new(sensor_rx))),
        imagery,
        models: ModelCatalog::builtin(),
    };

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Vehicle View")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), collaborators, &config))?;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::RedrawRequested => match app.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => {
                                app.resize(app.renderer.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("WGPU out of memory, exiting");
                                elwt.exit();
                            }
                            Err(e) => log::error!("Render error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
