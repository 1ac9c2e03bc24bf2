use crate::config::GridConfig;
use crate::pos::Pos;
use rand::Rng;
use std::collections::VecDeque;

/// Reward for any step that neither eats nor dies.
pub const STEP_REWARD: f32 = -1.0;
/// Reward for hitting a wall or the snake's own body.
pub const DEATH_REWARD: f32 = -999.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Left,
    Right,
    Up,
    Down,
}

impl Dir {
    /// Stable action order. Greedy ties resolve to the earliest entry.
    pub const ALL: [Dir; 4] = [Dir::Left, Dir::Right, Dir::Up, Dir::Down];

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
        }
    }

    /// Position in [`Dir::ALL`], used as the action-value slot.
    pub fn index(self) -> usize {
        match self {
            Dir::Left => 0,
            Dir::Right => 1,
            Dir::Up => 2,
            Dir::Down => 3,
        }
    }
}

/// What a single step did to the game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub reward: f32,
    pub terminal: bool,
    pub ate_apple: bool,
}

pub struct Game {
    pub width: i32,
    pub height: i32,
    pub head: Pos,
    /// Segments behind the head, most recent first.
    pub body: VecDeque<Pos>,
    /// Target length including the head. The body trails it by at most one move after eating.
    pub size: usize,
    pub dir: Dir,
    /// Direction of the last move actually made. Steering is checked against this.
    pub moved: Dir,
    pub apple: Pos,
    pub alive: bool,
    pub score: usize,
}

impl Game {
    /// Centered snake heading right with its body trailing to the left, plus a fresh apple.
    pub fn new<R: Rng + ?Sized>(grid: &GridConfig, rng: &mut R) -> Self {
        let head = Pos::new(grid.width / 2, grid.height / 2);
        let size = grid.initial_length;
        let body = (1..size as i32)
            .map(|i| Pos::new(head.x - i, head.y))
            .collect();

        let mut g = Self {
            width: grid.width,
            height: grid.height,
            head,
            body,
            size,
            dir: Dir::Right,
            moved: Dir::Right,
            apple: Pos::new(0, 0),
            alive: true,
            score: 0,
        };
        g.place_apple(rng);
        g
    }

    /// Head followed by the body, most recent first.
    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        std::iter::once(self.head).chain(self.body.iter().copied())
    }

    pub fn snake_contains(&self, p: Pos) -> bool {
        self.cells().any(|s| s == p)
    }

    pub fn in_bounds(&self, p: Pos) -> bool {
        p.in_bounds(self.width, self.height)
    }

    /// Resamples uniformly over the board until the cell is free of the snake.
    /// Never returns once the snake covers every cell.
    pub fn place_apple<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        debug_assert!(
            self.body.len() + 1 < (self.width * self.height) as usize,
            "no free cell left for an apple"
        );
        loop {
            let p = Pos::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height));
            if !self.snake_contains(p) {
                self.apple = p;
                break;
            }
        }
    }

    /// Moves one cell in `dir`. Reversal is not refused here; callers that care exclude it.
    pub fn step<R: Rng + ?Sized>(&mut self, dir: Dir, rng: &mut R) -> StepOutcome {
        if !self.alive {
            return StepOutcome { reward: 0.0, terminal: true, ate_apple: false };
        }

        self.dir = dir;
        self.moved = dir;
        if self.body.len() + 1 >= self.size {
            self.body.pop_back();
        }
        self.body.push_front(self.head);
        self.head = self.head.moved(dir);

        if self.head == self.apple {
            self.size += 1;
            self.score += 1;
            self.place_apple(rng);
            StepOutcome {
                reward: self.size as f32 - 2.0,
                terminal: false,
                ate_apple: true,
            }
        } else if self.body.contains(&self.head) || !self.in_bounds(self.head) {
            self.alive = false;
            StepOutcome { reward: DEATH_REWARD, terminal: true, ate_apple: false }
        } else {
            StepOutcome { reward: STEP_REWARD, terminal: false, ate_apple: false }
        }
    }

    /// Keyboard steering: a 180 degree turn relative to the last move is ignored,
    /// however many keys arrive before the next tick.
    pub fn change_dir(&mut self, new_dir: Dir) {
        if new_dir != self.moved.opposite() {
            self.dir = new_dir;
        }
    }

    /// Advances in the current direction.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StepOutcome {
        self.step(self.dir, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn grid() -> GridConfig {
        GridConfig::default()
    }

    fn game_with_apple(apple: Pos) -> (Game, SmallRng) {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut g = Game::new(&grid(), &mut rng);
        g.apple = apple;
        (g, rng)
    }

    #[test]
    fn test_opposites() {
        for d in Dir::ALL {
            assert_ne!(d, d.opposite());
            assert_eq!(d, d.opposite().opposite());
        }
        assert_eq!(Dir::Left.opposite(), Dir::Right);
        assert_eq!(Dir::Up.opposite(), Dir::Down);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, d) in Dir::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn test_new_game_layout() {
        let mut rng = SmallRng::seed_from_u64(1);
        let g = Game::new(&grid(), &mut rng);
        assert_eq!(g.head, Pos::new(10, 10));
        assert_eq!(g.body, VecDeque::from(vec![Pos::new(9, 10), Pos::new(8, 10)]));
        assert_eq!(g.size, 3);
        assert_eq!(g.dir, Dir::Right);
        assert!(g.alive);
        assert!(g.in_bounds(g.apple));
        assert!(!g.snake_contains(g.apple));
    }

    #[test]
    fn test_plain_steps_cost_one() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        for i in 1..=3 {
            let out = g.step(Dir::Right, &mut rng);
            assert_eq!(out, StepOutcome { reward: -1.0, terminal: false, ate_apple: false });
            assert_eq!(g.body.len(), 2);
            assert_eq!(g.head, Pos::new(10 + i, 10));
        }
        assert_eq!(g.size, 3);
    }

    #[test]
    fn test_eating_grows_and_respawns() {
        let (mut g, mut rng) = game_with_apple(Pos::new(11, 10));
        let out = g.step(Dir::Right, &mut rng);
        assert!(out.ate_apple);
        assert!(!out.terminal);
        assert_eq!(g.size, 4);
        assert_eq!(out.reward, 2.0);
        assert_eq!(g.score, 1);
        assert!(!g.snake_contains(g.apple));

        // Growth shows up on the following move: the tail is kept once.
        g.apple = Pos::new(0, 0);
        g.step(Dir::Right, &mut rng);
        assert_eq!(g.body.len(), 3);
        g.step(Dir::Right, &mut rng);
        assert_eq!(g.body.len(), 3);
    }

    #[test]
    fn test_reward_tracks_size_after_growth() {
        let (mut g, mut rng) = game_with_apple(Pos::new(11, 10));
        g.step(Dir::Right, &mut rng);
        g.apple = Pos::new(12, 10);
        let out = g.step(Dir::Right, &mut rng);
        assert_eq!(g.size, 5);
        assert_eq!(out.reward, 3.0);
    }

    #[test]
    fn test_reversing_into_body_is_fatal() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        let out = g.step(Dir::Left, &mut rng);
        assert_eq!(out.reward, DEATH_REWARD);
        assert!(out.terminal);
        assert!(!g.alive);
    }

    #[test]
    fn test_running_into_own_body() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        g.size = 5;
        g.body = VecDeque::from(vec![
            Pos::new(9, 10),
            Pos::new(9, 11),
            Pos::new(10, 11),
            Pos::new(11, 11),
        ]);
        let out = g.step(Dir::Down, &mut rng);
        assert!(out.terminal);
        assert_eq!(out.reward, -999.0);
    }

    #[test]
    fn test_wall_is_fatal() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        for _ in 0..9 {
            assert!(!g.step(Dir::Right, &mut rng).terminal);
        }
        assert_eq!(g.head, Pos::new(19, 10));
        let out = g.step(Dir::Right, &mut rng);
        assert!(out.terminal);
        assert_eq!(out.reward, DEATH_REWARD);
        assert!(!g.in_bounds(g.head));
    }

    #[test]
    fn test_step_after_death_is_inert() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        g.step(Dir::Left, &mut rng);
        let head = g.head;
        let out = g.step(Dir::Up, &mut rng);
        assert!(out.terminal);
        assert_eq!(out.reward, 0.0);
        assert_eq!(g.head, head);
    }

    #[test]
    fn test_change_dir_refuses_reverse() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        g.change_dir(Dir::Left);
        assert_eq!(g.dir, Dir::Right);
        g.change_dir(Dir::Up);
        assert_eq!(g.dir, Dir::Up);
        g.tick(&mut rng);
        assert_eq!(g.moved, Dir::Up);
        g.change_dir(Dir::Down);
        assert_eq!(g.dir, Dir::Up);
    }

    #[test]
    fn test_two_turns_in_one_tick_cannot_reverse() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        g.change_dir(Dir::Up);
        g.change_dir(Dir::Left);
        assert_eq!(g.dir, Dir::Up);
        let out = g.tick(&mut rng);
        assert!(!out.terminal);
        assert_eq!(g.head, Pos::new(10, 9));
    }

    #[test]
    fn test_turn_then_turn_back_within_a_tick() {
        let (mut g, mut rng) = game_with_apple(Pos::new(0, 0));
        g.change_dir(Dir::Up);
        g.change_dir(Dir::Down);
        assert_eq!(g.dir, Dir::Down);
        let out = g.tick(&mut rng);
        assert!(!out.terminal);
        assert_eq!(g.head, Pos::new(10, 11));
    }

    #[test]
    fn test_apple_never_on_snake() {
        let mut rng = SmallRng::seed_from_u64(3);
        let small = GridConfig { width: 4, height: 4, ..GridConfig::default() };
        let mut g = Game::new(&small, &mut rng);
        for _ in 0..200 {
            g.place_apple(&mut rng);
            assert!(!g.snake_contains(g.apple));
            assert!(g.in_bounds(g.apple));
        }
    }
}
