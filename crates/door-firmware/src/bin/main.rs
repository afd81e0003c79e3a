#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use door_core::config::Config;
use door_core::reporter::{Reporter, ReporterSettings};
use door_firmware::console::RttConsole;
use door_firmware::sensor_pin::{self, SharedSensorPin};
use door_firmware::tls::{EspTlsConnector, HardwareRng, TlsBuffers};
use door_firmware::{net, secrets};
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::{Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Io;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::info;
use rtt_target::{rtt_init, set_print_channel};
use static_cell::{ConstStaticCell, StaticCell};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

type DoorReporter = Reporter<'static, EspTlsConnector, SharedSensorPin, RttConsole>;

static CONFIG: StaticCell<Config<'static>> = StaticCell::new();
static TLS_BUFFERS: ConstStaticCell<TlsBuffers> = ConstStaticCell::new(TlsBuffers::new());

#[embassy_executor::task]
async fn reporter_task(mut reporter: DoorReporter) -> ! {
    reporter.run().await
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // Channel 0 carries logs and panics, channel 1 the raw API responses.
    let channels = rtt_init! {
        up: {
            0: {
                size: 1024,
                name: "Terminal"
            }
            1: {
                size: 1024,
                mode: NoBlockTrim,
                name: "Response"
            }
        }
    };
    set_print_channel(channels.up.0);
    rtt_target::init_logger();
    let console = RttConsole::new(channels.up.1);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let config: &'static Config<'static> = CONFIG.init(secrets::config());

    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());

    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, net_runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner.spawn(net::net_task(net_runner).unwrap());
    spawner.spawn(net::connection_task(wifi_controller, &config.network).unwrap());
    spawner.spawn(net::address_task(stack).unwrap());

    let connector = EspTlsConnector::new(stack, HardwareRng::new(rng), TLS_BUFFERS.take());
    let reporter = Reporter::new(
        &net::CONNECTIVITY,
        &sensor_pin::EDGES,
        connector,
        SharedSensorPin,
        console,
        ReporterSettings::from_config(config),
    );
    spawner.spawn(reporter_task(reporter).unwrap());

    // Armed last: no edge can fire before its consumer exists.
    let mut io = Io::new(peripherals.IO_MUX);
    sensor_pin::arm(&mut io, peripherals.GPIO4);
    info!("Door sensor armed on GPIO4");

    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
