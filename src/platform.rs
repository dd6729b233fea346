//! Platform-specific configuration

use crossterm::event::KeyModifiers;

/// Platform-appropriate modifier for the copy shortcut
/// - macOS: SUPER (Cmd key)
/// - Linux/Windows: CONTROL (Ctrl key)
#[cfg(target_os = "macos")]
pub const COPY_MODIFIER: KeyModifiers = KeyModifiers::SUPER;

#[cfg(not(target_os = "macos"))]
pub const COPY_MODIFIER: KeyModifiers = KeyModifiers::CONTROL;

/// Copy values shortcut display
#[cfg(target_os = "macos")]
pub const COPY_SHORTCUT: &str = "Cmd+Y";

#[cfg(not(target_os = "macos"))]
pub const COPY_SHORTCUT: &str = "^Y";

/// Form shortcuts use Ctrl on every platform
pub const SUBMIT_SHORTCUT: &str = "^S";
pub const RESET_SHORTCUT: &str = "^R";
pub const GET_VALUES_SHORTCUT: &str = "^G";
pub const SET_VALUES_SHORTCUT: &str = "^V";
pub const TRIGGER_SHORTCUT: &str = "^T";
pub const TRIGGER_FIELD_SHORTCUT: &str = "^L";
pub const ADD_ENTRY_SHORTCUT: &str = "^A";
pub const REMOVE_ENTRY_SHORTCUT: &str = "^D";
