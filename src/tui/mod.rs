pub mod draw;
pub mod events;
pub mod replay;
pub mod settings;
pub mod state;
pub mod util;

pub use draw::{render_to_buffer, transcript_lines};
pub use events::{handle_key, run, KeyAction};
pub use replay::{chunk_transcript, ReplayEvent};
pub use settings::Settings;
pub use state::{App, CollapseState};
