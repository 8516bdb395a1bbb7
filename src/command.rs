//! Remote commands accepted by the control socket and the MQTT subscriber

/// An action requested from outside the window
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a blast at a viewport position
    Fire { x: i32, y: i32 },
    /// Add a blast at a random position
    Random,
    /// Add a blast on each pixel with this probability, in percent
    Fill(f64),
    /// Remove every active blast
    Reset,
    Play,
    Stop,
    FogHeight(f64),
    PropagationSpeed(f64),
    Quit,
}

/// Parse one text command. Accepts `fire X Y`, a bare `X,Y` / `X Y` pair,
/// and the keyword forms listed on `Command`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim().to_lowercase();
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let rest: Vec<&str> = words.collect();

    match (head, rest.as_slice()) {
        ("fire" | "blast", [x, y]) => parse_point(x, y),
        ("random" | "f5", []) => Some(Command::Random),
        ("fill" | "autofill", [p]) => p.parse().ok().map(Command::Fill),
        ("reset" | "clear", []) => Some(Command::Reset),
        ("play" | "start", []) => Some(Command::Play),
        ("stop" | "pause", []) => Some(Command::Stop),
        ("fog", [v]) => v.parse().ok().map(Command::FogHeight),
        ("speed", [v]) => v.parse().ok().map(Command::PropagationSpeed),
        ("q" | "quit" | "exit", []) => Some(Command::Quit),
        (_, []) => {
            // "X,Y"
            let (x, y) = head.split_once(',')?;
            parse_point(x, y)
        },
        (x, [y]) => parse_point(x, y),
        _ => None,
    }
}

fn parse_point(x: &str, y: &str) -> Option<Command> {
    Some(Command::Fire {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fire_forms() {
        assert_eq!(parse_command("fire 10 20"), Some(Command::Fire { x: 10, y: 20 }));
        assert_eq!(parse_command("  15,7 "), Some(Command::Fire { x: 15, y: 7 }));
        assert_eq!(parse_command("3 4"), Some(Command::Fire { x: 3, y: 4 }));
        assert_eq!(parse_command("fire 1"), None);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_command("RESET"), Some(Command::Reset));
        assert_eq!(parse_command("random"), Some(Command::Random));
        assert_eq!(parse_command("play"), Some(Command::Play));
        assert_eq!(parse_command("stop"), Some(Command::Stop));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("fill 0.5"), Some(Command::Fill(0.5)));
        assert_eq!(parse_command("fog 0.3"), Some(Command::FogHeight(0.3)));
        assert_eq!(parse_command("speed 0.7"), Some(Command::PropagationSpeed(0.7)));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("explode everything now"), None);
        assert_eq!(parse_command("fog lots"), None);
        assert_eq!(parse_command("a,b"), None);
    }
}
