//! Window events → viewer commands.
//!
//! | Key    | Command                         |
//! |--------|---------------------------------|
//! | F5     | toggle software / hardware mode |
//! | F6     | capture the screen into the buffer |
//! | F7     | redraw the test pattern         |
//! | Escape | quit                            |

use crate::window::WindowEvent;

const VK_ESCAPE: u16 = 0x1B;
const VK_F5: u16 = 0x74;
const VK_F6: u16 = 0x75;
const VK_F7: u16 = 0x76;

/// Something the main loop should do in response to user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    ToggleRenderMode,
    CaptureScreen,
    DrawTestPattern,
    Quit,
}

/// Convert a window event to a viewer command (if applicable).
///
/// Only key presses trigger commands; releases and auto-repeat
/// bookkeeping are the window's concern.
pub fn translate_event(event: &WindowEvent) -> Option<ViewerCommand> {
    match event {
        WindowEvent::Close => Some(ViewerCommand::Quit),
        WindowEvent::Key(vk, true) => match *vk {
            VK_F5 => Some(ViewerCommand::ToggleRenderMode),
            VK_F6 => Some(ViewerCommand::CaptureScreen),
            VK_F7 => Some(ViewerCommand::DrawTestPattern),
            VK_ESCAPE => Some(ViewerCommand::Quit),
            _ => None,
        },
        WindowEvent::Key(_, false) | WindowEvent::Resize(..) | WindowEvent::Paint => None,
    }
}
