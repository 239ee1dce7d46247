//! Plays one seeded round per difficulty with a scripted "hand" that
//! chases the oldest square, and prints the event log.

use dance_off::{Canvas, Difficulty, Game, GameEvent};

const FPS: f64 = 60.0;

fn main() {
    println!("\n=== Dance Off Demo ===\n");

    let canvas = Canvas::new(640.0, 480.0);

    for difficulty in Difficulty::ALL {
        let mut game = Game::with_seed(difficulty, 2024);
        let s = game.settings_for(difficulty);
        println!(
            "   {:<6} spawn every {:.1}s  size {}–{}px  lifetime {:.1}s  moving={}",
            difficulty.name(), s.spawn_every, s.size.min, s.size.max, s.lifetime, s.moving
        );

        game.toggle(0.0);

        let (mut touched, mut expired) = (0, 0);
        let mut best_combo = 0;
        let mut messages = Vec::new();

        // 3 s countdown + 20 s of play
        for frame in 0..(23.0 * FPS) as usize {
            let now = frame as f64 / FPS;

            // Reach the oldest square only every third frame, so some expire.
            let tips: Vec<(f32, f32)> = if frame % 3 == 0 {
                game.squares()
                    .first()
                    .map(|sq| vec![(sq.x + sq.size / 2.0, sq.y + sq.size / 2.0)])
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            // ...and only when the square has been around for a while
            let tips = if game.squares().first().map_or(false, |sq| sq.age(now) > s.lifetime * 0.6) {
                tips
            } else {
                Vec::new()
            };

            for ev in game.update(now, &tips, canvas) {
                match ev {
                    GameEvent::Touched { combo, .. } => {
                        touched += 1;
                        best_combo = best_combo.max(combo);
                    }
                    GameEvent::Expired { .. } => expired += 1,
                    _ => {}
                }
            }
            if let Some(msg) = game.combo().visible_message(now) {
                if messages.last().map(String::as_str) != Some(msg) {
                    messages.push(msg.to_string());
                }
            }
        }

        println!(
            "          score {}  touched {}  expired {}  best combo {}  messages {:?}\n",
            game.score(), touched, expired, best_combo, messages
        );
    }
}
