use alpha2d::{Actor, Color, EngineConfig, Game, PhysicsType, Scene, Ticker, Vector};
use std::io::{stdout, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};
use crossterm::{
    ExecutableCommand, QueueableCommand,
    terminal::{Clear, ClearType},
    cursor::{Hide, Show, MoveTo},
    style::Print,
};
use rand::Rng;
use tracing_subscriber::EnvFilter;

const FRAME_DURATION: Duration = Duration::from_millis(16); // ~60 FPS
const SIMULATION_DURATION: Duration = Duration::from_secs(12);
const WIDTH: usize = 80;
const HEIGHT: usize = 24;
const CELLS_PER_METER_X: f32 = 4.0;
const CELLS_PER_METER_Y: f32 = 2.0;
const MAX_BOXES: usize = 12;

/// Drops a new box from the sky on every tick
struct Spawner {
    scene: Arc<Scene>,
    spawned: AtomicUsize,
}

impl Ticker for Spawner {
    fn tick(&self) -> anyhow::Result<()> {
        if self.spawned.fetch_add(1, Ordering::SeqCst) >= MAX_BOXES {
            return Ok(());
        }

        let size = rand::thread_rng().gen_range(20.0..45.0);
        let x = rand::thread_rng().gen_range(3.0..16.0);
        let actor = Actor::rect(&self.scene, size, size)?;
        actor.set_type(PhysicsType::Dynamic)?;
        actor.set_position(Vector::new(x, 11.0))?;
        actor.set_rotation(rand::thread_rng().gen_range(-0.5..0.5))?;
        actor.set_color(Color::ORANGE);

        // Ticks run beside the frame loop; join the world between steps
        let scene = Arc::clone(&self.scene);
        self.scene.world_handler().defer(move || {
            if let Err(e) = scene.add(&actor) {
                tracing::warn!(error = %e, "could not spawn box");
            }
        });
        Ok(())
    }
}

fn draw(scene: &Scene, grid: &mut [[char; WIDTH]; HEIGHT]) -> alpha2d::Result<()> {
    for row in grid.iter_mut() {
        row.fill(' ');
    }

    let ppm = scene.pixels_per_meter();
    for item in scene.render_items()? {
        if !item.render.visible {
            continue;
        }

        // Rotation is ignored: the console only shows bounds
        let bounds = item.shape.local_bounds();
        let min = item.position + bounds.min * (1.0 / ppm);
        let max = item.position + bounds.max * (1.0 / ppm);
        let glyph = if item.render.color == Color::ORANGE { '#' } else { '=' };

        let x0 = (min.x * CELLS_PER_METER_X).max(0.0) as usize;
        let x1 = ((max.x * CELLS_PER_METER_X) as usize).min(WIDTH - 1);
        let y0 = (min.y * CELLS_PER_METER_Y).max(0.0) as usize;
        let y1 = ((max.y * CELLS_PER_METER_Y) as usize).min(HEIGHT - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                grid[HEIGHT - 1 - y][x] = glyph;
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let game = Game::new(EngineConfig::default());
    let scene = game.create_scene("falling-boxes")?;

    // 20 m wide floor, one metre thick
    let floor = Actor::rect(&scene, 600.0, 30.0)?;
    floor.set_color(Color::GRAY);
    scene.add(&floor)?;

    let spawner = Arc::new(Spawner {
        scene: Arc::clone(&scene),
        spawned: AtomicUsize::new(0),
    });
    let tickers = game.ticker_manager()?;
    tickers.register_with_interval(spawner.clone(), 600)?;

    let mut coordinator = scene.frame_coordinator()?;

    let mut stdout = stdout();
    stdout.execute(Hide)?;

    let mut grid = [[' '; WIDTH]; HEIGHT];
    let start = Instant::now();
    while start.elapsed() < SIMULATION_DURATION {
        let frame_start = Instant::now();
        coordinator.run_frame()?;

        draw(&scene, &mut grid)?;
        stdout.queue(Clear(ClearType::All))?;
        for (row, line) in grid.iter().enumerate() {
            stdout.queue(MoveTo(0, row as u16))?;
            stdout.queue(Print(line.iter().collect::<String>()))?;
        }
        stdout.queue(MoveTo(0, HEIGHT as u16))?;
        stdout.queue(Print(format!(
            "frame {:5}  actors {:2}  t = {:5.2}s",
            coordinator.frame_count(),
            scene.actor_count(),
            start.elapsed().as_secs_f32()
        )))?;
        stdout.flush()?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            sleep(FRAME_DURATION - elapsed);
        }
    }

    stdout.execute(Show)?;
    println!();

    coordinator.shutdown();
    game.shutdown();
    Ok(())
}
