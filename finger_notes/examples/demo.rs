//! Sweeps each finger across the frame and prints the notes the mapper
//! would trigger.

use finger_notes::{NoteMapper, NoteScale, DENSITIES};
use hand_landmarks::Finger;

fn main() {
    println!("\n=== Finger Notes Demo ===\n");

    let scale = NoteScale::big_scale();
    let names: Vec<String> = scale.notes().iter().map(|n| n.to_string()).collect();
    println!("   scale: {}\n", names.join(" "));

    for density in DENSITIES {
        let mut mapper = NoteMapper::new(scale.clone(), density, 0.25);
        println!("   density {} → {} fingers", density, mapper.playable_fingers().len());

        for finger in mapper.playable_fingers() {
            let range: Vec<String> = mapper.sub_range(finger).iter().map(|n| n.to_string()).collect();

            // sweep left → right at 60 fps for two seconds
            let mut played = Vec::new();
            for frame in 0..120 {
                let x = frame as f32 / 119.0;
                let t = frame as f64 / 60.0;
                if let Some(trig) = mapper.handle(finger, x, t) {
                    played.push(trig.note.to_string());
                }
            }
            println!(
                "     {:<7} [{}]  played: {}",
                finger.name(), range.join(" "), played.join(" ")
            );
        }
        println!();
    }

    // Every Finger variant always has a slice, even when the scale runs out.
    let mapper = NoteMapper::new(scale, 5, 0.25);
    for f in Finger::ALL {
        assert!(!mapper.sub_range(f).is_empty());
    }
}
