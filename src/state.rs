use crate::game::{Dir, Game};

const APPLE_RIGHT: u16 = 1 << 0;
const APPLE_LEFT: u16 = 1 << 1;
const APPLE_BELOW: u16 = 1 << 2;
const APPLE_ABOVE: u16 = 1 << 3;
const DIR_SHIFT: u16 = 4;
const DANGER_SHIFT: u16 = 8;
const DIR_MASK: u16 = 0b1111 << DIR_SHIFT;

/// Number of boolean features packed into a [`DiscreteState`].
pub const FEATURES: u32 = 12;

/// Twelve boolean features packed into the low bits of a `u16`.
///
/// Bits 0..4 say where the apple lies relative to the head (right, left,
/// below, above), bits 4..8 one-hot encode the heading and bits 8..12 flag
/// immediate danger, both in [`Dir::ALL`] order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscreteState(u16);

impl DiscreteState {
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Accepts only keys `encode` can produce: twelve bits with exactly one heading set.
    pub fn from_bits(bits: u16) -> Option<Self> {
        if bits >> FEATURES != 0 || (bits & DIR_MASK).count_ones() != 1 {
            return None;
        }
        Some(Self(bits))
    }

    pub fn apple_right(self) -> bool {
        self.0 & APPLE_RIGHT != 0
    }

    pub fn apple_left(self) -> bool {
        self.0 & APPLE_LEFT != 0
    }

    pub fn apple_below(self) -> bool {
        self.0 & APPLE_BELOW != 0
    }

    pub fn apple_above(self) -> bool {
        self.0 & APPLE_ABOVE != 0
    }

    pub fn heading(self, dir: Dir) -> bool {
        self.0 & (1 << (DIR_SHIFT + dir.index() as u16)) != 0
    }

    pub fn danger(self, dir: Dir) -> bool {
        self.0 & (1 << (DANGER_SHIFT + dir.index() as u16)) != 0
    }
}

/// Maps the board to its lookup key. Danger looks one cell ahead against the
/// walls and the snake as it stands now, not as it will be after the move.
pub fn encode(game: &Game) -> DiscreteState {
    let head = game.head;
    let apple = game.apple;
    let mut k: u16 = 0;

    if head.x < apple.x { k |= APPLE_RIGHT; }
    if head.x > apple.x { k |= APPLE_LEFT; }
    if head.y < apple.y { k |= APPLE_BELOW; }
    if head.y > apple.y { k |= APPLE_ABOVE; }

    k |= 1 << (DIR_SHIFT + game.dir.index() as u16);

    for dir in Dir::ALL {
        let p = head.moved(dir);
        if !game.in_bounds(p) || game.snake_contains(p) {
            k |= 1 << (DANGER_SHIFT + dir.index() as u16);
        }
    }
    DiscreteState(k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::pos::Pos;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::VecDeque;

    fn game() -> (Game, SmallRng) {
        let mut rng = SmallRng::seed_from_u64(11);
        let g = Game::new(&GridConfig::default(), &mut rng);
        (g, rng)
    }

    #[test]
    fn test_start_position_features() {
        let (mut g, _) = game();
        g.apple = Pos::new(15, 4);
        let s = encode(&g);
        assert!(s.apple_right());
        assert!(!s.apple_left());
        assert!(!s.apple_below());
        assert!(s.apple_above());
        assert!(s.heading(Dir::Right));
        // The first body segment sits directly behind the head.
        assert!(s.danger(Dir::Left));
        assert!(!s.danger(Dir::Right));
        assert!(!s.danger(Dir::Up));
        assert!(!s.danger(Dir::Down));
    }

    #[test]
    fn test_apple_on_same_column() {
        let (mut g, _) = game();
        g.apple = Pos::new(10, 18);
        let s = encode(&g);
        assert!(!s.apple_right());
        assert!(!s.apple_left());
        assert!(s.apple_below());
        assert!(!s.apple_above());
    }

    #[test]
    fn test_wall_danger_in_corner() {
        let (mut g, _) = game();
        g.head = Pos::new(0, 0);
        g.body = VecDeque::from(vec![Pos::new(1, 0), Pos::new(2, 0)]);
        g.dir = Dir::Left;
        let s = encode(&g);
        assert!(s.danger(Dir::Left));
        assert!(s.danger(Dir::Up));
        assert!(s.danger(Dir::Right));
        assert!(!s.danger(Dir::Down));
    }

    #[test]
    fn test_exactly_one_heading_along_a_game() {
        let (mut g, mut rng) = game();
        let moves = [Dir::Up, Dir::Up, Dir::Left, Dir::Left, Dir::Down, Dir::Down, Dir::Right];
        for dir in moves {
            g.step(dir, &mut rng);
            let s = encode(&g);
            let set = Dir::ALL.iter().filter(|&&d| s.heading(d)).count();
            assert_eq!(set, 1);
            assert!(s.heading(dir));
        }
    }

    #[test]
    fn test_from_bits_validation() {
        let (g, _) = game();
        let s = encode(&g);
        assert_eq!(DiscreteState::from_bits(s.bits()), Some(s));
        assert_eq!(DiscreteState::from_bits(0), None);
        assert_eq!(DiscreteState::from_bits(0b0011 << DIR_SHIFT), None);
        assert_eq!(DiscreteState::from_bits(1 << 12 | 1 << DIR_SHIFT), None);
    }
}
