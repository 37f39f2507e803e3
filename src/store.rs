// ===============================
// src/store.rs (in-memory session store)
// ===============================
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use ahash::AHashMap as HashMap;
use rand::Rng;

use crate::error::{GameError, GameResult};
use crate::session::Game;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Random draws per code length before trying a longer code.
const CODE_ATTEMPTS: usize = 32;
/// Extra characters a code may grow by when the configured length is crowded.
const CODE_GROWTH: usize = 2;

pub type SharedGame = Arc<Mutex<Game>>;

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char).collect()
}

/// Exclusive access to one game. A panic mid-action cannot leave a half
/// applied mutation behind (validation runs first), so poison is ignored.
pub fn lock(game: &Mutex<Game>) -> MutexGuard<'_, Game> {
    game.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Games by code. The map lock covers insert/lookup/evict only; each game
/// has its own mutex for the length of one action.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SharedGame>>,
    code_length: usize,
}

impl SessionStore {
    pub fn new(code_length: usize) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), code_length: code_length.max(1) }
    }

    /// Reserve a fresh code and store the game built for it. A crowded code
    /// space falls back to longer codes; the search is bounded either way.
    pub fn create<R: Rng + ?Sized>(&self, rng: &mut R, build: impl FnOnce(String) -> Game) -> GameResult<SharedGame> {
        let mut map = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let code = (self.code_length..=self.code_length + CODE_GROWTH)
            .flat_map(|len| std::iter::repeat(len).take(CODE_ATTEMPTS))
            .map(|len| generate_code(rng, len))
            .find(|code| !map.contains_key(code))
            .ok_or(GameError::CodesExhausted)?;
        let game = Arc::new(Mutex::new(build(code.clone())));
        map.insert(code, game.clone());
        Ok(game)
    }

    pub fn get(&self, code: &str) -> GameResult<SharedGame> {
        let key = normalize_code(code);
        let map = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&key).cloned().ok_or(GameError::SessionNotFound(key))
    }

    /// Store a game under its own code, replacing any previous one.
    pub fn put(&self, game: Game) -> SharedGame {
        let key = normalize_code(&game.code);
        let shared = Arc::new(Mutex::new(game));
        let mut map = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(key, shared.clone());
        shared
    }

    pub fn evict(&self, code: &str) -> bool {
        let mut map = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(&normalize_code(code)).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
