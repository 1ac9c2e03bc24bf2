//! Window front end: the trained agent playing at a fixed tick rate, or a human
//! steering with the keyboard. Training never goes through here.

use std::time::{Duration, Instant};

use anyhow::Context;
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::SmallRng;
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

use crate::agent::QTable;
use crate::config::{AgentConfig, AppConfig, GridConfig};
use crate::game::{Dir, Game};
use crate::pos::Pos;
use crate::trainer::transition;

/// Something the window can advance once per tick and draw.
pub trait Controller {
    fn game(&self) -> &Game;

    /// Advances one tick.
    fn tick(&mut self);

    fn steer(&mut self, _dir: Dir) {}

    fn restart(&mut self) {}

    fn title(&self) -> String;
}

/// Greedy agent. Keeps learning in memory; nothing is written back to disk.
pub struct AgentPlayer {
    grid: GridConfig,
    agent: AgentConfig,
    table: QTable,
    game: Game,
    rng: SmallRng,
    episodes_left: usize,
    played: usize,
}

impl AgentPlayer {
    pub fn new(config: &AppConfig, table: QTable, episodes: usize, mut rng: SmallRng) -> Self {
        let game = Game::new(&config.grid, &mut rng);
        Self {
            grid: config.grid.clone(),
            agent: config.agent.clone(),
            table,
            game,
            rng,
            episodes_left: episodes.max(1),
            played: 0,
        }
    }
}

impl Controller for AgentPlayer {
    fn game(&self) -> &Game {
        &self.game
    }

    fn tick(&mut self) {
        if !self.game.alive {
            return;
        }
        let outcome = transition(&mut self.game, &mut self.table, &self.agent, 0.0, &mut self.rng);
        if outcome.terminal {
            self.played += 1;
            self.episodes_left -= 1;
            info!(episode = self.played, score = self.game.score, "game over");
            if self.episodes_left > 0 {
                self.game = Game::new(&self.grid, &mut self.rng);
            }
        }
    }

    fn title(&self) -> String {
        format!("Snake Q-learning | game {} | score {}", self.played + 1, self.game.score)
    }
}

/// Keyboard play.
pub struct HumanPlayer {
    grid: GridConfig,
    game: Game,
    rng: SmallRng,
}

impl HumanPlayer {
    pub fn new(grid: &GridConfig, mut rng: SmallRng) -> Self {
        let game = Game::new(grid, &mut rng);
        Self { grid: grid.clone(), game, rng }
    }
}

impl Controller for HumanPlayer {
    fn game(&self) -> &Game {
        &self.game
    }

    fn tick(&mut self) {
        if self.game.alive && self.game.tick(&mut self.rng).terminal {
            info!(score = self.game.score, "game over");
        }
    }

    fn steer(&mut self, dir: Dir) {
        self.game.change_dir(dir);
    }

    fn restart(&mut self) {
        if !self.game.alive {
            self.game = Game::new(&self.grid, &mut self.rng);
        }
    }

    fn title(&self) -> String {
        if self.game.alive {
            format!("Snake | score {}", self.game.score)
        } else {
            format!("Snake | game over, score {} | R to restart", self.game.score)
        }
    }
}

/// Opens a window and drives `controller` until Escape or close. Does not return on success.
pub fn run_window<C: Controller + 'static>(config: &AppConfig, mut controller: C) -> anyhow::Result<()> {
    let canvas = Canvas::new(&config.grid);
    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();

    let window = WindowBuilder::new()
        .with_title(controller.title())
        .with_inner_size(LogicalSize::new(canvas.width, canvas.height))
        .with_resizable(false)
        .build(&event_loop)
        .context("failed to create window")?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(canvas.width, canvas.height, surface_texture).context("failed to create pixel buffer")?
    };

    let tick_duration = Duration::from_secs_f64(1.0 / f64::from(config.display.ticks_per_second));
    let mut last_update = Instant::now();
    let mut paused = false;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            canvas.draw(pixels.frame_mut(), controller.game());
            if let Err(err) = pixels.render() {
                error!(%err, "render failed");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape) || input.close_requested() || input.destroyed() {
                *control_flow = ControlFlow::Exit;
                return;
            }

            if input.key_pressed(VirtualKeyCode::P) {
                paused = !paused;
            }
            if input.key_pressed(VirtualKeyCode::R) {
                controller.restart();
            }

            if input.key_pressed(VirtualKeyCode::Up) || input.key_pressed(VirtualKeyCode::W) {
                controller.steer(Dir::Up);
            }
            if input.key_pressed(VirtualKeyCode::Down) || input.key_pressed(VirtualKeyCode::S) {
                controller.steer(Dir::Down);
            }
            if input.key_pressed(VirtualKeyCode::Left) || input.key_pressed(VirtualKeyCode::A) {
                controller.steer(Dir::Left);
            }
            if input.key_pressed(VirtualKeyCode::Right) || input.key_pressed(VirtualKeyCode::D) {
                controller.steer(Dir::Right);
            }

            if !paused && last_update.elapsed() >= tick_duration {
                controller.tick();
                last_update = Instant::now();
                window.set_title(&controller.title());
            }

            window.request_redraw();
        }
    });
}

type Rgb = (u8, u8, u8);

const BACKGROUND: Rgb = (20, 20, 30);
const CHECKER: Rgb = (25, 25, 35);
const APPLE: Rgb = (220, 50, 50);
const HEAD: Rgb = (100, 255, 100);
const EYE: Rgb = (0, 0, 0);

/// Pixel geometry of the board and the RGBA drawing routines on a frame buffer.
struct Canvas {
    columns: i32,
    rows: i32,
    cell: u32,
    width: u32,
    height: u32,
}

impl Canvas {
    fn new(grid: &GridConfig) -> Self {
        let cell = grid.cell_size;
        Self {
            columns: grid.width,
            rows: grid.height,
            cell,
            width: grid.width as u32 * cell,
            height: grid.height as u32 * cell,
        }
    }

    fn draw(&self, frame: &mut [u8], game: &Game) {
        for px in frame.chunks_exact_mut(4) {
            px.copy_from_slice(&[BACKGROUND.0, BACKGROUND.1, BACKGROUND.2, 255]);
        }
        for y in 0..self.rows {
            for x in 0..self.columns {
                if (x + y) % 2 == 0 {
                    self.fill_cell(frame, Pos::new(x, y), CHECKER);
                }
            }
        }

        self.fill_cell(frame, game.apple, APPLE);

        for (i, pos) in game.body.iter().enumerate() {
            let shade = 200 - (i * 10).min(100) as u8;
            self.fill_cell(frame, *pos, (50, shade, 50));
        }
        let head = if game.alive { HEAD } else { (160, 160, 160) };
        self.fill_cell(frame, game.head, head);
        self.draw_eyes(frame, game.head, game.dir);
    }

    /// Cells off the board (a head that just left it) are skipped.
    fn fill_cell(&self, frame: &mut [u8], pos: Pos, color: Rgb) {
        if !pos.in_bounds(self.columns, self.rows) {
            return;
        }
        let x = pos.x as u32 * self.cell;
        let y = pos.y as u32 * self.cell;
        self.fill_rect(frame, x, y, self.cell, self.cell, color);
    }

    fn draw_eyes(&self, frame: &mut [u8], head: Pos, dir: Dir) {
        if !head.in_bounds(self.columns, self.rows) {
            return;
        }
        let base_x = head.x as u32 * self.cell;
        let base_y = head.y as u32 * self.cell;
        let near = self.cell / 4;
        let far = self.cell - self.cell / 4 - self.cell / 10 - 1;
        let size = (self.cell / 10).max(1);

        let eyes = match dir {
            Dir::Right => [(far, near), (far, far)],
            Dir::Left => [(near, near), (near, far)],
            Dir::Up => [(near, near), (far, near)],
            Dir::Down => [(near, far), (far, far)],
        };
        for (ex, ey) in eyes {
            self.fill_rect(frame, base_x + ex, base_y + ey, size, size, EYE);
        }
    }

    fn fill_rect(&self, frame: &mut [u8], x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        let x2 = (x + w).min(self.width);
        let y2 = (y + h).min(self.height);
        for py in y..y2 {
            for px in x..x2 {
                let idx = ((py * self.width + px) * 4) as usize;
                if let Some(dst) = frame.get_mut(idx..idx + 4) {
                    dst.copy_from_slice(&[color.0, color.1, color.2, 255]);
                }
            }
        }
    }
}
