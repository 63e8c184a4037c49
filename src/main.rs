// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.


mod util;

use embassy_executor::Spawner;
use embassy_sync::pubsub::PubSubChannel;
use embassy_sync::channel::Channel;
use kitchen_scale::application::api::ScaleApi;
use kitchen_scale::application::messaging::{ApiRequest, RequestChannel, RequestChannelReceiver};
use kitchen_scale::application::weighing_manager::{MonitorSettings, MonitorState, StopSignal, WeighingManager};
use kitchen_scale::config::ScaleConfig;
use kitchen_scale::storage::JsonCalibrationFile;
use kitchen_scale::weight::interface::hx711::Hx711;
use kitchen_scale::weight::messaging::{WeightChannel, WeightChannelPublisher, WeightChannelSubscriber, WeightEvents};
use kitchen_scale::weight::{ScaleHandle, WeightScale};
use gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::CdevPin;
use log::{debug, error, info, warn};
use static_cell::StaticCell;
use std::io::BufRead;
use std::process;

type Gauge = Hx711<CdevPin, CdevPin>;
type Scale = ScaleHandle<Gauge, JsonCalibrationFile>;

const GPIO_CONSUMER: &str = "kitchen-scale";

static WEIGHT_CHANNEL: WeightChannel = PubSubChannel::new();
static REQUEST_CHANNEL: RequestChannel = Channel::new();
static STOP: StopSignal = StopSignal::new();
static MONITOR: MonitorState = MonitorState::new();
static SCALE: StaticCell<Scale> = StaticCell::new();
static CONFIG: StaticCell<ScaleConfig> = StaticCell::new();

fn open_gauge(config: &ScaleConfig) -> Result<Gauge, gpio_cdev::errors::Error> {
    let mut chip = Chip::new(&config.gpio_chip)?;
    let clock = chip
        .get_line(config.clock_pin)?
        .request(LineRequestFlags::OUTPUT, 0, GPIO_CONSUMER)?;
    let data = chip
        .get_line(config.data_pin)?
        .request(LineRequestFlags::INPUT, 0, GPIO_CONSUMER)?;

    Ok(Hx711::new(CdevPin::new(clock)?, CdevPin::new(data)?, config.gain)
        .with_ready_timeout(config.ready_timeout()))
}

fn load_config(args: &[String]) -> ScaleConfig {
    let Some(path) = util::config_path(args) else {
        return ScaleConfig::default();
    };
    match ScaleConfig::load(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    }
}

/// Console commands are forwarded to the request task, `quit` stops the scale.
fn console_reader() {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command.eq_ignore_ascii_case("quit") {
            break;
        }
        match command.parse::<ApiRequest>() {
            Ok(request) => {
                if REQUEST_CHANNEL.try_send(request).is_err() {
                    warn!("Busy, dropped '{}'", command);
                }
            }
            Err(e) => warn!("{}. Commands: tare, calibrate <kg>, status, quit", e),
        }
    }
    STOP.signal(());
}

#[embassy_executor::task]
async fn weighing_task(
    scale: &'static Scale,
    publisher: WeightChannelPublisher<'static>,
    settings: MonitorSettings,
) {
    let mut weighing_manager = WeighingManager::new(scale, publisher, &MONITOR, settings);
    weighing_manager.run(&STOP).await;
    info!("System stopped");
    process::exit(0);
}

#[embassy_executor::task]
async fn request_task(
    scale: &'static Scale,
    requests: RequestChannelReceiver<'static>,
    config: &'static ScaleConfig,
) {
    let mut api = ScaleApi::new(scale, &MONITOR)
        .with_samples(config.tare_samples, config.calibration_samples);
    loop {
        let request = requests.receive().await;
        debug!("Handling {:?}", request);
        println!("{}", api.handle(request).await.to_json());
    }
}

#[embassy_executor::task]
async fn event_log_task(mut subscriber: WeightChannelSubscriber<'static>) {
    loop {
        match subscriber.next_message_pure().await {
            WeightEvents::WeightUpdate(weight_kg) => debug!("Weight: {:.3} kg", weight_kg),
            WeightEvents::SensorFault => warn!("No reading from the weight sensor"),
            WeightEvents::LoadDetected(weight_kg) => info!("Load placed: {:.3} kg", weight_kg),
            WeightEvents::LoadRemoved => info!("Load removed"),
            WeightEvents::Shutdown => break,
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let args: Vec<String> = std::env::args().collect();
    env_logger::Builder::from_default_env()
        .filter_level(util::parse_log_level(&args))
        .format_timestamp_millis()
        .init();

    info!("Kitchen scale starting");
    let config = load_config(&args);
    let Some(defaults) = config.default_calibration() else {
        error!("Invalid default calibration");
        process::exit(2);
    };

    let gauge = match open_gauge(&config) {
        Ok(gauge) => gauge,
        Err(e) => {
            error!("Unable to open HX711 lines on {}: {}", config.gpio_chip, e);
            process::exit(1);
        }
    };
    let store = JsonCalibrationFile::new(&config.calibration_path);
    let scale = match WeightScale::start(gauge, store, defaults, config.timing()).await {
        Ok(scale) => scale,
        Err(e) => {
            error!("Weight sensor initialisation failed: {}", e);
            process::exit(1);
        }
    };
    let calibration = scale.calibration();
    info!(
        "Weight sensor ready. Factor: {}, offset: {}",
        calibration.scale_factor(),
        calibration.tare_offset()
    );

    let scale = SCALE.init(ScaleHandle::new(scale));
    let config = CONFIG.init(config);

    if let Err(e) = ctrlc::set_handler(|| STOP.signal(())) {
        warn!("Unable to install Ctrl-C handler: {}", e);
    }
    std::thread::spawn(console_reader);

    // Static wiring, a failure here is a programming error
    let publisher = WEIGHT_CHANNEL.publisher().unwrap();
    let subscriber = WEIGHT_CHANNEL.subscriber().unwrap();
    spawner.spawn(event_log_task(subscriber).unwrap());
    spawner.spawn(request_task(scale, REQUEST_CHANNEL.receiver(), config).unwrap());
    spawner.spawn(weighing_task(scale, publisher, config.monitor_settings()).unwrap());
}
