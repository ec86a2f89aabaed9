//! Chess Rooms - multiplayer chess server
//!
//! A rules engine (move generation, legality filter, castling, check
//! detection) behind a room-based TCP service speaking NUL-framed JSON.

// ============================================
// Rules
// ============================================

/// Board model, move strings and the legality engine
pub mod game;

// ============================================
// Service
// ============================================

/// Server configuration (YAML)
pub mod config;
/// Wire framing and message types
pub mod network;
/// Room registry, rooms and connection handling
pub mod servers;
