use rand::SeedableRng;
use rand::rngs::SmallRng;

use snake_q_learning::agent::QTable;
use snake_q_learning::config::AppConfig;
use snake_q_learning::game::Dir;
use snake_q_learning::persist;
use snake_q_learning::state::DiscreteState;
use snake_q_learning::trainer::Trainer;

fn small_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.grid.width = 10;
    config.grid.height = 10;
    config.training.episodes = 300;
    config.training.decay_interval = 100;
    config.training.step_limit = Some(10_000);
    config.validate().unwrap();
    config
}

#[test]
fn test_train_save_load_continue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q_table.bin");
    let config = small_config();
    let mut rng = SmallRng::seed_from_u64(2024);

    let table = persist::load(&path).unwrap();
    assert!(table.is_empty());

    let mut trainer = Trainer::new(&config, table);
    let stats = trainer.run(config.training.episodes, &mut rng);
    assert_eq!(stats.episodes, 300);
    assert!(stats.best_score >= 1);
    assert!(trainer.table().len() > 10);

    persist::save(trainer.table(), &path).unwrap();
    let reloaded = persist::load(&path).unwrap();
    assert_eq!(&reloaded, trainer.table());

    // Every stored key is one the encoder can produce.
    for (s, values) in reloaded.iter() {
        assert_eq!(DiscreteState::from_bits(s.bits()), Some(s));
        assert!(values.iter().all(|v| v.is_finite()));
        assert_eq!(Dir::ALL.iter().filter(|&&d| s.heading(d)).count(), 1);
    }

    // A second run picks the table back up and keeps learning.
    let before = reloaded.len();
    let mut again = Trainer::new(&config, reloaded);
    again.run(50, &mut rng);
    assert!(again.table().len() >= before);
}

#[test]
fn test_json_and_bincode_agree() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config();
    let mut rng = SmallRng::seed_from_u64(7);
    let mut trainer = Trainer::new(&config, QTable::new());
    trainer.run(40, &mut rng);

    let bin = dir.path().join("table.bin");
    persist::save(trainer.table(), &bin).unwrap();
    assert_eq!(&persist::load(&bin).unwrap(), trainer.table());

    let json = dir.path().join("table.json");
    let mut rounded = QTable::new();
    for (s, values) in trainer.table().iter() {
        // Quarter steps survive JSON text exactly.
        rounded.insert(s, (*values).map(|v| (v * 4.0).round() / 4.0));
    }
    persist::save(&rounded, &json).unwrap();
    assert_eq!(persist::load(&json).unwrap(), rounded);
}

#[test]
fn test_play_mode_does_not_touch_saved_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q_table.bin");
    let config = small_config();
    let mut rng = SmallRng::seed_from_u64(31);

    let mut trainer = Trainer::new(&config, QTable::new());
    trainer.run(100, &mut rng);
    persist::save(trainer.table(), &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();

    let mut player = Trainer::for_play(&config, persist::load(&path).unwrap());
    let stats = player.run(3, &mut rng);
    assert_eq!(stats.epsilon, 0.0);
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}
