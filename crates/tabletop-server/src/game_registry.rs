use std::collections::HashMap;

use tabletop_core::game_mode::GameMode;
use tabletop_core::game_trait::RuleEngine;

/// Factory function type for creating rule engines on the server.
type EngineFactory = fn() -> Box<dyn RuleEngine>;

/// Registry mapping game modes to engine factories. Modes whose crate is
/// compiled out are simply absent.
pub struct ServerGameRegistry {
    factories: HashMap<GameMode, EngineFactory>,
}

impl Default for ServerGameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerGameRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "gomoku")]
        self.factories
            .insert(GameMode::Gomoku, || Box::new(tabletop_gomoku::Gomoku::new()));
        #[cfg(feature = "go")]
        self.factories
            .insert(GameMode::Go, || Box::new(tabletop_go::Go::new()));
        #[cfg(feature = "xiangqi")]
        self.factories.insert(GameMode::Xiangqi, || {
            Box::new(tabletop_xiangqi::Xiangqi::new())
        });
    }

    pub fn create(&self, mode: GameMode) -> Option<Box<dyn RuleEngine>> {
        self.factories.get(&mode).map(|f| f())
    }

    /// Return the number of registered game modes.
    pub fn available_games(&self) -> usize {
        self.factories.len()
    }
}
