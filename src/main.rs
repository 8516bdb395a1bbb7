use blastfield::background;
use blastfield::display::{Display, InputEvent, RenderTarget};
use blastfield::mqtt::MqttClient;
use blastfield::{BlastConfig, BlastEngine, Command, Flow, Result, PERCENT_OPTIONS};
use sdl2::keyboard::Keycode;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[cfg(unix)]
use blastfield::control::Controller;

const DEFAULT_CONFIG_PATH: &str = "blastfield.json";
/// Probability per pixel used by the fill key, in percent
const AUTOFILL_PERCENT: f64 = 0.001;

struct Args {
    width: Option<u32>,
    height: Option<u32>,
    config: PathBuf,
    background: Option<PathBuf>,
    vsync: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn print_help() {
    println!("Usage: blastfield [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --width W, -w W       Set window width (default: from config)");
    println!("  --height H, -h H      Set window height (default: from config)");
    println!("  --config PATH, -c PATH  Configuration file (default: {})", DEFAULT_CONFIG_PATH);
    println!("  --background PATH, -b PATH  Background image (png, jpg, bmp)");
    println!("  --no-vsync            Disable VSync for uncapped framerate");
    println!("  --help                Show this help message");
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        width: None,
        height: None,
        config: PathBuf::from(DEFAULT_CONFIG_PATH),
        background: None,
        vsync: true,
    };

    let mut i = 1;
    while i < argv.len() {
        let value = argv.get(i + 1);
        match argv[i].as_str() {
            "--no-vsync" => args.vsync = false,
            "--width" | "-w" => {
                args.width = value.and_then(|v| v.parse().ok());
                i += 1;
            },
            "--height" | "-h" => {
                args.height = value.and_then(|v| v.parse().ok());
                i += 1;
            },
            "--config" | "-c" => {
                if let Some(v) = value {
                    args.config = PathBuf::from(v);
                }
                i += 1;
            },
            "--background" | "-b" => {
                args.background = value.map(PathBuf::from);
                i += 1;
            },
            "--help" => {
                print_help();
                std::process::exit(0);
            },
            other => warn!(arg = other, "ignoring unknown argument"),
        }
        i += 1;
    }

    args
}

fn load_config(args: &Args) -> BlastConfig {
    let mut config = if args.config.exists() {
        BlastConfig::load(&args.config).unwrap_or_else(|e| {
            warn!(path = %args.config.display(), error = %e, "using default configuration");
            BlastConfig::default()
        })
    } else {
        BlastConfig::default()
    };
    if let Some(w) = args.width.filter(|&w| w > 0) {
        config.width = w;
    }
    if let Some(h) = args.height.filter(|&h| h > 0) {
        config.height = h;
    }
    config
}

/// Next entry of `PERCENT_OPTIONS` after `current`, wrapping around
fn next_percent(current: f64) -> f64 {
    let idx = PERCENT_OPTIONS
        .iter()
        .position(|&p| (p - current).abs() < 1e-9)
        .map_or(0, |i| (i + 1) % PERCENT_OPTIONS.len());
    PERCENT_OPTIONS[idx]
}

fn key_command(key: Keycode, config: &BlastConfig) -> Option<Command> {
    match key {
        Keycode::Escape => Some(Command::Quit),
        Keycode::F5 => Some(Command::Random),
        Keycode::P => Some(Command::Play),
        Keycode::S => Some(Command::Stop),
        Keycode::R => Some(Command::Reset),
        Keycode::A => Some(Command::Fill(AUTOFILL_PERCENT)),
        Keycode::F => Some(Command::FogHeight(next_percent(config.fog_height))),
        Keycode::V => Some(Command::PropagationSpeed(next_percent(
            config.propagation_speed,
        ))),
        _ => None,
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = parse_args();
    let config = load_config(&args);

    let mqtt = match &config.mqtt {
        Some(mqtt_config) => match MqttClient::connect(mqtt_config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "mqtt disabled");
                None
            },
        },
        None => None,
    };

    #[cfg(unix)]
    let controller = Controller::new()
        .map_err(|e| warn!(error = %e, "control socket disabled"))
        .ok();

    let (width, height) = (config.width, config.height);
    let mut engine = BlastEngine::new(config)?;
    engine.set_background(background::default_scene(width, height));

    let (mut display, texture_creator) =
        Display::with_options("blastfield", width, height, args.vsync)?;

    if let Some(path) = &args.background {
        if let Some((w, h)) = engine.load_background(path) {
            display.set_size(w, h)?;
        }
    }

    let mut target_size = engine.viewport();
    let mut target = RenderTarget::with_size(&texture_creator, target_size.0, target_size.1)?;

    info!(width = target_size.0, height = target_size.1, "blastfield started");
    println!("=== blastfield ===");
    println!("Use --help for command line options.");
    println!("Controls:");
    println!("  Click / drag - Place a blast");
    println!("  F5           - Blast at a random position");
    println!("  A            - Scatter blasts over the board");
    println!("  P / S        - Play / stop (any key also starts)");
    println!("  R            - Reset the board");
    println!("  F            - Cycle fog height");
    println!("  V            - Cycle propagation speed");
    println!("  F2           - Save configuration");
    println!("  Escape       - Quit");

    let mut dirty = true;

    'main: loop {
        let mut commands = Vec::new();

        for event in display.poll_events() {
            match event {
                InputEvent::Quit => break 'main,
                InputEvent::KeyDown(key) => {
                    // Any key starts a stopped board
                    if !engine.is_playing() && key != Keycode::Escape && key != Keycode::S {
                        commands.push(Command::Play);
                    }
                    if key == Keycode::F2 {
                        match engine.config().save(&args.config) {
                            Ok(()) => info!(path = %args.config.display(), "configuration saved"),
                            Err(e) => error!(error = %e, "failed to save configuration"),
                        }
                    }
                    commands.extend(key_command(key, engine.config()));
                },
                InputEvent::MouseDrag { x, y } | InputEvent::MouseUp { x, y } => {
                    commands.push(Command::Fire { x, y });
                },
                InputEvent::Resized { width, height } => {
                    engine.on_viewport_resized(width, height);
                    dirty = true;
                },
            }
        }

        #[cfg(unix)]
        {
            if let Some(controller) = &controller {
                commands.extend(controller.poll());
            }
        }
        if let Some(mqtt) = &mqtt {
            commands.extend(mqtt.poll());
        }

        for command in commands {
            dirty = true;
            match engine.apply_command(command) {
                Ok(Flow::Quit) => break 'main,
                Ok(Flow::Continue) => {},
                Err(e) => warn!(error = %e, "command rejected"),
            }
        }

        if engine.viewport() != target_size {
            target_size = engine.viewport();
            target = RenderTarget::with_size(&texture_creator, target_size.0, target_size.1)?;
            if (display.width(), display.height()) != target_size {
                display.set_size(target_size.0, target_size.1)?;
            }
        }

        let redraw = engine.poll_redraw() || dirty;
        dirty = false;
        let frame = if redraw {
            engine.render_frame()
        } else {
            engine.compositor().presented()
        };
        display.present(&mut target, frame)?;

        if !redraw && !args.vsync {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    engine.stop();
    info!("blastfield stopped");
    Ok(())
}
