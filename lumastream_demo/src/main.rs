//! Walks through the stock effects against a bridge or a local simulator.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use lumastream_lib::{
	collaborators::{
		FileGroupSource, GroupDefinition, GroupSource, LightDefinition, StaticGroupSource,
	},
	effects::{presets, EffectInterval, IteratorEffectMode, PointEffect},
	streaming::UdpTransport,
	CancellationToken, Group, LightId, RgbColor, SessionKey, StreamingClient, StreamingConfig,
};
use tokio::{
	io::{AsyncBufReadExt, BufReader, Lines, Stdin},
	time,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Streams demo effects to an entertainment area")]
struct Args {
	/// Streaming endpoint of the bridge or simulator
	#[arg(long, default_value = "127.0.0.1:2100")]
	bridge: SocketAddr,
	#[arg(long, default_value = "aSimulatedUser")]
	app_key: String,
	#[arg(long, default_value = "01234567890123456789012345678901")]
	client_key: String,
	/// Entertainment area to stream to
	#[arg(long, default_value = "2")]
	area: String,
	/// JSON or CBOR file holding a list of group definitions. A six light layout is used without one.
	#[arg(long)]
	groups: Option<PathBuf>,
	/// JSON or CBOR streaming config
	#[arg(long)]
	config: Option<PathBuf>,
	/// Advance every this many seconds instead of waiting for Enter
	#[arg(long)]
	step_seconds: Option<u64>,
}

/// Moves on to the next step, either on Enter or after a fixed time
struct Stepper {
	lines: Lines<BufReader<Stdin>>,
	step: Option<Duration>,
}

impl Stepper {
	async fn next(&mut self, prompt: &str) -> Result<()> {
		println!("{}", prompt);
		match self.step {
			Some(step) => time::sleep(step).await,
			None => {
				self.lines.next_line().await.context("Could not read from stdin")?;
			}
		}
		return Ok(());
	}

	/// Waits, then cancels the running step and hands out a fresh token
	async fn cancel_and_next(&mut self, token: CancellationToken) -> Result<CancellationToken> {
		self.next("Press Enter for next sample").await?;
		token.cancel();
		return Ok(CancellationToken::new());
	}
}

fn sample_layout(area: &str) -> GroupDefinition {
	let positions = [
		(-1.0, 1.0),
		(-1.0, 0.0),
		(-1.0, -1.0),
		(1.0, -1.0),
		(1.0, 0.0),
		(1.0, 1.0),
	];
	return GroupDefinition {
		area_id: String::from(area),
		lights: positions
			.iter()
			.enumerate()
			.map(|(index, (x, y))| LightDefinition {
				id: LightId(index as u16 + 1),
				x: *x,
				y: *y,
				z: 0.0,
			})
			.collect(),
	};
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config = match args.config {
		Some(ref path) => StreamingConfig::load(path)
			.with_context(|| format!("Could not load config from {}", path.display()))?,
		None => StreamingConfig::default(),
	};

	let definition = match args.groups {
		Some(ref path) => FileGroupSource::new(path).load_group(&args.area).await,
		None => StaticGroupSource::new(vec![sample_layout(&args.area)]).load_group(&args.area).await,
	}
	.with_context(|| format!("Could not load entertainment area {}", args.area))?;
	let group = Group::from_definition(&definition).context("Invalid group layout")?;

	let client = StreamingClient::new(
		args.bridge,
		SessionKey::new(args.app_key, args.client_key),
		UdpTransport::new(),
		config,
	);
	let session = client
		.connect_default(&group, args.area.clone())
		.await
		.context("Could not connect to the bridge")?;
	session.start_auto_update_default()?;

	let mut stepper = Stepper {
		lines: BufReader::new(tokio::io::stdin()).lines(),
		step: args.step_seconds.map(Duration::from_secs),
	};

	// Left side top to bottom, then right side bottom to top
	let ordered: Vec<LightId> = group.registry().sweep_order().iter().map(LightId::from).collect();
	let registry = group.registry();
	let mut token = CancellationToken::new();
	let mut running = Vec::new();

	info!(lights = ordered.len(), "starting samples");

	println!("Random color on all lights");
	running.push(group.run(
		presets::random_color(ordered.clone(), IteratorEffectMode::All, Duration::from_millis(250)),
		token.clone(),
	)?);
	token = stepper.cancel_and_next(token).await?;

	println!("Different random colors on all lights");
	running.push(group.run(
		presets::random_color(ordered.clone(), IteratorEffectMode::AllIndividual, Duration::from_millis(250)),
		token.clone(),
	)?);
	token = stepper.cancel_and_next(token).await?;

	println!("Knight rider (works best with 6+ lights)");
	running.push(group.run(presets::knight_rider(ordered.clone()), token.clone())?);
	token = stepper.cancel_and_next(token).await?;

	let wait_time = EffectInterval::new(Duration::from_millis(750));
	println!("Flash lights (750ms), press Enter to decrease by 200 ms");
	running.push(group.run(
		presets::flash_quick(ordered.clone(), RgbColor::WHITE, IteratorEffectMode::Cycle, wait_time.clone()),
		token.clone(),
	)?);
	for decrease in [200, 200, 200, 100] {
		stepper.next("").await?;
		wait_time.decrease(Duration::from_millis(decrease));
		println!("Flash ({}ms)", wait_time.get().as_millis());
	}
	token = stepper.cancel_and_next(token).await?;

	println!("Flash on random lights");
	running.push(group.run(
		presets::flash_quick(ordered.clone(), RgbColor::WHITE, IteratorEffectMode::Random, wait_time.clone()),
		token.clone(),
	)?);
	token = stepper.cancel_and_next(token).await?;

	println!("Flash on ALL lights");
	wait_time.set(Duration::from_millis(150));
	running.push(group.run(
		presets::flash(ordered.clone(), RgbColor::WHITE, IteratorEffectMode::All, wait_time.clone(), None, None),
		token.clone(),
	)?);
	token = stepper.cancel_and_next(token).await?;

	println!("Flash effect with transition times");
	let red = RgbColor::from_hex("FF0000")?;
	let fade = Some(Duration::from_secs(1));
	running.push(group.run(
		presets::flash(registry.left(), red, IteratorEffectMode::All, Duration::from_secs(1), fade, fade),
		token.clone(),
	)?);
	time::sleep(Duration::from_secs(2)).await;
	running.push(group.run(
		presets::flash(registry.right(), red, IteratorEffectMode::All, Duration::from_secs(1), fade, fade),
		token.clone(),
	)?);
	token = stepper.cancel_and_next(token).await?;

	println!("A red light moving horizontally across the room");
	let red_light = PointEffect::new(RgbColor::RED, 0.5);
	red_light.set_position(0.0, -1.0, 0.0);
	let placed = group.place_effect(red_light.clone());
	red_light.start();
	let mover = {
		let red_light = red_light.clone();
		let token = token.clone();
		tokio::spawn(async move {
			let mut step = 0.1;
			while !token.is_cancelled() {
				red_light.move_by(step, 0.0, 0.0);
				tokio::select! {
					_ = token.cancelled() => break,
					_ = time::sleep(Duration::from_millis(100)) => {},
				}
				let x = red_light.position().x;
				if x >= 1.5 {
					step = -0.1;
				}
				if x <= -1.5 {
					step = 0.1;
				}
			}
		})
	};
	token = stepper.cancel_and_next(token).await?;
	mover.await.ok();
	red_light.stop();
	group.remove_effect(placed);

	println!("Christmas colors");
	running.push(group.run(presets::christmas(ordered), token.clone())?);
	stepper.cancel_and_next(token).await?;

	stepper.next("Press Enter to exit").await?;
	for effect in running {
		effect.join().await;
	}
	client.disconnect().await;
	if let Some(failure) = session.fatal_error() {
		info!(%failure, "session ended with an error");
	}
	return Ok(());
}
