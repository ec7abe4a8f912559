use std::pin::pin;
use std::thread;
use std::time::{Duration, Instant};

use tickloop::activity::activity;
use tickloop::join::{join, strong, weak};
use tickloop::timer::{delay, Clock};
use tickloop::{Frame, Status};

const TICK: Duration = Duration::from_millis(100);

#[tickloop::activity]
async fn blink() {
    loop {
        println!("LED: red");
        delay(2).await;
        println!("LED: off");
        delay(1).await;
    }
}

fn main() {
    let clock = Clock::new();
    let clock = &clock;

    let mut root = pin!(activity(|| async move {
        let mut blink = pin!(blink());
        let mut timeout = pin!(activity(|| async move {
            clock.delay_ms(1000).await;
        }));

        join([strong(timeout.as_mut()), weak(blink.as_mut())]).await;
        println!("blinked long enough");
    }));

    let start = Instant::now();
    while root.as_mut().tick() == Status::Waiting {
        thread::sleep(TICK);
        clock.set_now(start.elapsed().as_millis() as u32);
    }
}
