//! Prints the fingertips of a synthetic hand and the JSON line a detector
//! would emit for it.

use hand_landmarks::{Finger, Frame, Hand};

fn main() {
    println!("\n=== Hand Landmarks Demo ===\n");

    let frame = Frame::new(0.0, vec![Hand::synthetic(0.45, 0.35, 0.06)]);

    for tip in frame.fingertips(&Finger::ALL) {
        let (px, py) = tip.point.to_pixels(640.0, 480.0);
        println!(
            "   hand {}  {:<7} landmark {:>2}  ({:.3}, {:.3})  → ({:>5.1}, {:>5.1}) px",
            tip.hand, tip.finger.name(), tip.finger.landmark_index(),
            tip.point.x, tip.point.y, px, py,
        );
    }

    match frame.to_json_line() {
        Ok(line) => println!("\n   wire: {}…\n", &line[..line.len().min(96)]),
        Err(e)   => eprintln!("   encode failed: {}", e),
    }
}
