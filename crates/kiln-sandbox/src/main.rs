//! Bouncing quads demo.
//!
//! Four quads fly around the window and bounce off its edges. Close the
//! window or press Escape to quit. Set `KILN_CONFIG` to a JSON file to
//! override the window, clear color, tick rate or log filter.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use kiln::prelude::*;

/// Pixels per second.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Velocity {
    direction: Vec2,
}

impl Velocity {
    fn new(x: f32, y: f32) -> Self {
        Self {
            direction: Vec2::new(x, y),
        }
    }
}

const EVENT_TIMEOUT: Duration = Duration::from_millis(1);

fn handle_window_events(world: &mut World, _dt: f32) -> SystemResult {
    let signals = world
        .get_resource_mut::<WindowContext>()
        .ok_or_else(|| Error::Window("event handler ran without a window".to_string()))?
        .poll_events(EVENT_TIMEOUT);

    for signal in signals {
        match signal {
            WindowSignal::CloseRequested | WindowSignal::KeyPressed(KeyCode::Escape) => {
                log::info!("quit requested");
                world.resource_mut::<AppState>().running = false;
            }
            _ => {}
        }
    }
    Ok(())
}

fn setup(world: &mut World) -> SystemResult {
    let size = Vec2::splat(20.0);
    world.spawn((
        Quad::new(Vec2::new(20.0, 10.0), size),
        Velocity::new(-500.0, 500.0),
    ));
    world.spawn((
        Quad::new(Vec2::new(70.0, 10.0), size),
        Velocity::new(500.0, 500.0),
    ));
    world.spawn((
        Quad::new(Vec2::new(130.0, 10.0), size),
        Velocity::new(-500.0, 500.0),
    ));
    world.spawn((
        Quad::new(Vec2::new(180.0, 10.0), size),
        Velocity::new(500.0, 500.0),
    ));
    Ok(())
}

/// Move `quad` by `velocity * dt` and reflect it off the `bounds` edges,
/// keeping it fully inside.
fn bounce(quad: &mut Quad, velocity: &mut Velocity, dt: f32, bounds: Vec2) {
    quad.position += velocity.direction * dt;

    if quad.position.x + quad.dimension.x >= bounds.x {
        quad.position.x = bounds.x - quad.dimension.x;
        velocity.direction.x = -velocity.direction.x;
    } else if quad.position.x < 0.0 {
        quad.position.x = 0.0;
        velocity.direction.x = -velocity.direction.x;
    }

    if quad.position.y + quad.dimension.y >= bounds.y {
        quad.position.y = bounds.y - quad.dimension.y;
        velocity.direction.y = -velocity.direction.y;
    } else if quad.position.y < 0.0 {
        quad.position.y = 0.0;
        velocity.direction.y = -velocity.direction.y;
    }
}

fn bounce_quads(world: &mut World, dt: f32) -> SystemResult {
    let info = world
        .get_resource::<WindowCreationInfo>()
        .ok_or_else(|| Error::Window("no WindowCreationInfo registered".to_string()))?;
    let bounds = Vec2::new(info.width as f32, info.height as f32);

    world.query::<(&mut Quad, &mut Velocity)>(|_, (quad, velocity)| {
        bounce(quad, velocity, dt, bounds);
    });
    Ok(())
}

fn build_app(config: &AppConfig) -> App {
    let mut app = App::new();
    app.set_fixed_time_step(config.fixed_time_step);
    app.add_plugin(
        Renderer2dPlugin::new(WindowPlugin::new(
            config.window.clone(),
            handle_window_events,
        ))
        .with_clear_color(config.clear_color),
    )
    .add_system(startup(setup))
    .add_system(fixed_update(bounce_quads));
    app
}

fn main() -> ExitCode {
    let config_path = std::env::var_os("KILN_CONFIG").map(PathBuf::from);
    let config = match AppConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kiln-sandbox: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging);

    build_app(&config).run();
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln::ecs::Phase;

    const BOUNDS: Vec2 = Vec2::new(1280.0, 720.0);

    #[test]
    fn free_flight_just_moves() {
        let mut quad = Quad::new(Vec2::new(100.0, 100.0), Vec2::splat(20.0));
        let mut velocity = Velocity::new(-500.0, 500.0);
        bounce(&mut quad, &mut velocity, 0.1, BOUNDS);
        assert_eq!(quad.position, Vec2::new(50.0, 150.0));
        assert_eq!(velocity, Velocity::new(-500.0, 500.0));
    }

    #[test]
    fn left_edge_clamps_and_reflects() {
        let mut quad = Quad::new(Vec2::new(5.0, 100.0), Vec2::splat(20.0));
        let mut velocity = Velocity::new(-500.0, 0.0);
        bounce(&mut quad, &mut velocity, 0.1, BOUNDS);
        assert_eq!(quad.position.x, 0.0);
        assert_eq!(velocity.direction.x, 500.0);
    }

    #[test]
    fn top_edge_clamps_and_reflects() {
        let mut quad = Quad::new(Vec2::new(100.0, 10.0), Vec2::splat(20.0));
        let mut velocity = Velocity::new(0.0, -500.0);
        bounce(&mut quad, &mut velocity, 0.1, BOUNDS);
        assert_eq!(quad.position, Vec2::new(100.0, 0.0));
        assert_eq!(velocity.direction, Vec2::new(0.0, 500.0));
    }

    #[test]
    fn right_edge_clamps_and_reflects() {
        let mut quad = Quad::new(Vec2::new(1240.0, 300.0), Vec2::splat(20.0));
        let mut velocity = Velocity::new(500.0, 0.0);
        bounce(&mut quad, &mut velocity, 0.1, BOUNDS);
        assert_eq!(quad.position, Vec2::new(1260.0, 300.0));
        assert_eq!(velocity.direction, Vec2::new(-500.0, 0.0));
    }

    #[test]
    fn bottom_right_corner_reflects_both_axes() {
        let mut quad = Quad::new(Vec2::new(1250.0, 690.0), Vec2::splat(20.0));
        let mut velocity = Velocity::new(500.0, 500.0);
        bounce(&mut quad, &mut velocity, 0.1, BOUNDS);
        assert_eq!(quad.position, Vec2::new(1260.0, 700.0));
        assert_eq!(velocity, Velocity::new(-500.0, -500.0));
    }

    #[test]
    fn touching_the_far_edge_counts_as_a_hit() {
        let mut quad = Quad::new(Vec2::new(1260.0, 0.0), Vec2::splat(20.0));
        let mut velocity = Velocity::new(60.0, 0.0);
        bounce(&mut quad, &mut velocity, 0.0, BOUNDS);
        assert_eq!(quad.position.x, 1260.0);
        assert_eq!(velocity.direction.x, -60.0);
    }

    #[test]
    fn setup_spawns_four_moving_quads() {
        let mut world = World::new();
        setup(&mut world).unwrap();
        let mut seen = Vec::new();
        world.query::<(&Quad, &Velocity)>(|_, (quad, velocity)| {
            seen.push((quad.position.x, velocity.direction.x));
        });
        assert_eq!(
            seen,
            vec![(20.0, -500.0), (70.0, 500.0), (130.0, -500.0), (180.0, 500.0)]
        );
    }

    #[test]
    fn one_fixed_tick_moves_every_quad() {
        let mut world = World::new();
        world
            .register_resource(WindowCreationInfo::default())
            .unwrap();
        setup(&mut world).unwrap();
        bounce_quads(&mut world, 1.0 / 60.0).unwrap();

        let mut quads = Vec::new();
        world.query::<&Quad>(|_, quad| quads.push(quad.position));
        assert_eq!(quads.len(), 4);
        let step = 500.0 / 60.0;
        assert!((quads[0].x - (20.0 - step)).abs() < 1e-4);
        assert!((quads[1].x - (70.0 + step)).abs() < 1e-4);
        assert!(quads.iter().all(|p| (p.y - (10.0 + step)).abs() < 1e-4));
    }

    #[test]
    fn bounce_without_window_info_fails() {
        let mut world = World::new();
        assert!(matches!(
            bounce_quads(&mut world, 0.1),
            Err(Error::Window(_))
        ));
    }

    #[test]
    fn app_wires_demo_systems() {
        let app = build_app(&AppConfig::default());
        assert!(app.state().can_run);
        assert_eq!(
            app.system_names(Phase::Startup),
            ["create_window", "setup_renderer", "setup"]
        );
        assert_eq!(app.system_names(Phase::FixedUpdate), ["bounce_quads"]);
        assert_eq!(app.system_names(Phase::Update)[0], "window_event_handler");
    }
}
