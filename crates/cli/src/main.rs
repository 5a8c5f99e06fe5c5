//! Scripted demo of the edit engine against the in-memory media engine:
//! performs a batch of edits, unwinds them, replays them, and dumps the
//! resulting timeline as JSON.

use edit::edits::{
    append_action, consolidate_all_blanks_action, cut_action, lift_multiple_action,
    overwrite_move_action,
};
use edit::{
    EditAction, EditContext, GuiUpdates, InMemoryEngine, NoSync, NullFrontend, Sequence,
    SourceRef, TrackKind, WaveformCache,
};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut seq = Sequence::new(
        InMemoryEngine::new(2),
        vec![TrackKind::Video, TrackKind::Audio],
    );
    let mut frontend = NullFrontend;
    let mut sync = NoSync;
    let mut waveforms = WaveformCache::new(64);
    let mut history: Vec<EditAction<InMemoryEngine>> = Vec::new();

    {
        let mut ctx = EditContext {
            frontend: &mut frontend,
            sync: &mut sync,
            waveforms: &mut waveforms,
            gui: GuiUpdates::Suppressed,
        };

        for (name, length) in [("intro", 120), ("interview", 480), ("outro", 90)] {
            let clip = seq.create_clip(SourceRef::Media(format!("{name}.mp4").into()), name);
            let mut action = append_action(0, clip, 0, length - 1);
            action.do_edit(&mut seq, &mut ctx)?;
            history.push(action);
        }

        // Cut the interview at its halfway point and lift the first half.
        let mut cut = cut_action(0, 1, 240);
        cut.do_edit(&mut seq, &mut ctx)?;
        history.push(cut);

        let mut lift = lift_multiple_action(0, 1, 1);
        lift.do_edit(&mut seq, &mut ctx)?;
        history.push(lift);

        // Slide the outro 60 frames earlier, over the gap.
        let outro_index = seq.tracks()[0].count() - 1;
        let outro_start = seq.tracks()[0].clip_start(outro_index);
        let mut slide =
            overwrite_move_action(0, outro_start - 60, outro_start + 30, outro_index, outro_index);
        slide.do_edit(&mut seq, &mut ctx)?;
        history.push(slide);

        let mut tidy = consolidate_all_blanks_action();
        tidy.do_edit(&mut seq, &mut ctx)?;
        history.push(tidy);

        info!(edits = history.len(), "session scripted");

        for action in history.iter_mut().rev() {
            action.undo(&mut seq, &mut ctx)?;
        }
        info!("session unwound");

        for action in history.iter_mut() {
            action.redo(&mut seq, &mut ctx)?;
        }
        info!("session replayed");
    }

    println!("{}", serde_json::to_string_pretty(&seq.snapshot())?);
    Ok(())
}
