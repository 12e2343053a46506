//! The built-in demo patch: a sine display plus a rendered row of circles.

use lux_patch::{BlockSettings, Patch, PatchError};
use lux_runtime::{run_frame, FrameInput, RuntimeState};

use crate::{compile, standard_registry};

/// Build the demo patch against the given name table.
pub fn demo_patch(names: lux_patch::Names) -> Result<Patch, PatchError> {
    let mut patch = Patch::new(names);

    // Time → Sin → Display
    let time = patch.add_block("Time", BlockSettings::None);
    let sin = patch.add_block("Sin", BlockSettings::None);
    let display = patch.add_block("Display", BlockSettings::None);
    patch.connect(time, "out", sin, "in")?;
    patch.connect(sin, "out", display, "in")?;

    // Array(8) → PositionXY → Render
    let array = patch.add_block("Array", BlockSettings::Count(8));
    let position = patch.add_block("PositionXY", BlockSettings::None);
    let render = patch.add_block("Render", BlockSettings::None);
    patch.connect(array, "elements", position, "source")?;
    patch.connect(position, "pos", render, "pos")?;

    Ok(patch)
}

/// Compile the demo and run a few frames, printing what happens.
pub fn run_demo(frames: u32) -> Result<(), String> {
    let registry = standard_registry().map_err(|e| e.to_string())?;
    let patch = demo_patch(registry.names().clone()).map_err(|e| e.to_string())?;

    let outcome = compile(&patch, &registry).map_err(|e| e.to_string())?;
    for diagnostic in &outcome.frontend.diagnostics {
        println!("{diagnostic}");
    }
    let Some(backend) = outcome.backend else {
        return Err("demo patch failed to compile".to_owned());
    };

    println!(
        "schedule: {} steps, {} slots, {} expressions",
        backend.schedule.steps.len(),
        backend.schedule.slot_plan.slot_count(),
        backend.exprs.len()
    );

    let mut state = RuntimeState::from_plan(&backend.schedule.slot_plan);
    for frame in 0..frames {
        let input = FrameInput::at(f64::from(frame) / 60.0, u64::from(frame));
        let rendered = run_frame(&backend.schedule, &backend.exprs, &mut state, &input)
            .map_err(|e| e.to_string())?;
        for draw in &rendered.draws {
            println!(
                "frame {frame}: draw {} lanes × stride {}",
                draw.count, draw.stride
            );
        }
        for desc in backend.schedule.slot_plan.iter().filter(|d| d.observed) {
            let values = state
                .slot_values(&backend.schedule.slot_plan, desc.slot)
                .map_err(|e| e.to_string())?;
            println!("frame {frame}: observed slot {:?} = {values:?}", desc.slot);
        }
    }
    Ok(())
}
