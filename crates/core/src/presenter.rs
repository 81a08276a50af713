//! The boundary towards whatever displays the conversation.

use crate::conversation::Turn;
use crate::map::MapArtifact;

/// Receives everything the user should see.
///
/// User input flows the other way, through
/// [`Orchestrator::handle_user_input`](crate::Orchestrator::handle_user_input)
/// and [`Session::reset`](crate::Session::reset).
pub trait Presenter {
    /// Shows the whole conversation log.
    fn render_history(&self, turns: &[Turn]);

    /// Shows the assistant's answer so far.
    ///
    /// Every call passes a longer version of the same text, never a
    /// reordered one.
    fn render_streaming_draft(&self, draft: &str);

    /// Shows the current map, or clears it.
    fn render_map(&self, map: Option<&MapArtifact>);

    /// Shows an error that doesn't end the conversation.
    fn render_error(&self, message: &str);
}
