//! Isobar - Environmental Telemetry Node Firmware
//!
//! Raspberry Pi Pico W with an Enviro-style sensor pack: samples
//! temperature, pressure, humidity and light once per tick, shows the
//! corrected reading on the OLED, and publishes it over MQTT at a fixed
//! interval.
//!
//! All policy lives in `isobar-core`; this binary only wires hardware to
//! the core traits and runs the control loop on the main task.

#![no_std]
#![no_main]

use core::cell::RefCell;

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_time::{with_timeout, Delay, Duration, Timer};
use embedded_hal_bus::i2c::RefCellDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use isobar_core::config::NodeConfig;
use isobar_core::scheduler::{ControlLoop, Hardware, TickReport};
use isobar_core::state::{Event, FaultKind, NodeState};
use isobar_core::throttle::{PublishOutcome, Uplink};
use isobar_display::ScreenRenderer;
use isobar_drivers::sensor::bme68x::ADDRESS_SECONDARY;
use isobar_drivers::sensor::{AlsGain, Bme68x, Bme68xConfig, Ltr559};

use crate::display::OledBackend;
use crate::io::{Buttons, RgbLed};
use crate::net::{MqttPublisher, WifiLink};
use crate::tasks::TickerSource;

mod config;
mod display;
mod io;
mod net;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

static CONFIG: StaticCell<NodeConfig> = StaticCell::new();
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

/// How long boot waits for the first DHCP lease before ticking anyway
const BOOT_LINK_WAIT: Duration = Duration::from_secs(30);

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Isobar firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config: &'static NodeConfig = match config::load_config() {
        Ok(config) => CONFIG.init(config),
        Err(e) => {
            error!("Embedded configuration rejected: {}", e);
            let mut control = ControlLoop::from_config(&NodeConfig::new());
            halt(control.handle(Event::Fault(FaultKind::Config))).await
        }
    };
    let mut control = ControlLoop::from_config(config);

    // Enviro pack: BME68x and LTR-559 share I2C0 (SDA GPIO4, SCL GPIO5)
    // with an SSD1306 OLED at 0x3C. The stock ST7789 SPI panel is not
    // driven; without the OLED display init fails and the node halts.
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let bus = RefCell::new(I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config));

    let mut environment = Bme68x::new(
        RefCellDevice::new(&bus),
        Delay,
        ADDRESS_SECONDARY,
        Bme68xConfig::default(),
    );
    if let Err(e) = environment.init() {
        error!("BME68x init failed: {}", e);
        control.handle(Event::Fault(FaultKind::SensorInit));
    }

    let mut light = Ltr559::new(RefCellDevice::new(&bus), Delay, AlsGain::X4);
    if let Err(e) = light.init() {
        error!("LTR-559 init failed: {}", e);
        control.handle(Event::Fault(FaultKind::SensorInit));
    }

    let mut backend = OledBackend::new(RefCellDevice::new(&bus));
    if let Err(e) = backend.init() {
        error!("OLED init failed: {}", e);
        control.handle(Event::Fault(FaultKind::DisplayInit));
    }
    let mut display = ScreenRenderer::new(backend);

    if control.state().is_terminal() {
        halt(control.state()).await
    }
    info!("Sensors and display initialized");

    // Buttons A/B/X/Y on GPIO12-15, RGB LED on GPIO6/7/10
    let mut buttons = Buttons::new(
        Input::new(p.PIN_12, Pull::Up),
        Input::new(p.PIN_13, Pull::Up),
        Input::new(p.PIN_14, Pull::Up),
        Input::new(p.PIN_15, Pull::Up),
    );
    let mut led = RgbLed::new(
        Output::new(p.PIN_6, Level::High),
        Output::new(p.PIN_7, Level::High),
        Output::new(p.PIN_10, Level::High),
    );

    // CYW43 on the Pico W: power GPIO23, CS GPIO25, data GPIO24, clock GPIO29
    let fw = include_bytes!("../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = CYW43_STATE.init(cyw43::State::new());
    let (net_device, mut wifi_control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(tasks::cyw43_task(runner)).unwrap();

    wifi_control.init(clm).await;
    wifi_control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("Wi-Fi regulatory domain {}", config.wifi.country.as_str());

    let mut rng = RoscRng;
    let seed = rng.next_u64();
    let (stack, runner) = embassy_net::new(
        net_device,
        NetConfig::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(tasks::net_task(runner)).unwrap();

    spawner
        .spawn(tasks::link_task(wifi_control, stack, config))
        .unwrap();

    if with_timeout(BOOT_LINK_WAIT, stack.wait_config_up()).await.is_err() {
        warn!("Wi-Fi not up after boot wait, link task keeps trying");
    }

    let mut network = WifiLink::new(stack);
    let mut publisher = MqttPublisher::new(stack, &config.mqtt);

    let mut ticks = TickerSource::new(config.schedule.tick_ms);
    let mut hardware = Hardware {
        environment: &mut environment,
        light: &mut light,
        display: &mut display,
        input: &mut buttons,
        indicator: &mut led,
    };
    let mut uplink = Uplink {
        network: &mut network,
        publisher: &mut publisher,
        topic: config.mqtt.topic.as_str(),
    };

    info!("Control loop running");
    let state = control
        .run(&mut ticks, &mut hardware, &mut uplink, log_tick)
        .await;
    halt(state).await
}

/// Per-tick observability: publish outcomes, input and clock events
fn log_tick(report: &TickReport) {
    match report.publish {
        PublishOutcome::Skipped => {}
        PublishOutcome::Attempted(Ok(())) => info!(
            "Published ({} of {} attempts ok)",
            report.stats.successes, report.stats.attempts
        ),
        PublishOutcome::Attempted(Err(e)) => warn!(
            "Publish failed: {} ({} in a row)",
            e, report.stats.consecutive_failures
        ),
    }

    if let Some(reason) = report.acquisition.environment.discard_reason() {
        debug!("Environment sample discarded: {}", reason);
    }
    if let Err(e) = report.render {
        warn!("Render failed: {}", e);
    }
    if let Some(button) = report.button {
        info!("Button {} pressed", button);
    }
    if report.clock_synced {
        info!("Wall clock synchronised");
    }
    trace!("Tick at {} ms, stored={}", report.now_ms, report.stored);
}

/// Park the node after the control loop has stopped
async fn halt(state: NodeState) -> ! {
    match state {
        NodeState::Halted(fault) => error!("Node halted: {}", fault),
        other => warn!("Control loop stopped in state {}", other),
    }

    loop {
        Timer::after_secs(60).await;
        trace!("Halted heartbeat");
    }
}
