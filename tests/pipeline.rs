use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use pixmap_panels::{
    AvailabilitySource, MemorySurface, Pipeline, Pixel, PlaylistSource, RunOptions, StopToken,
    pixmap,
};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pixmap_panels_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_solid_pixmap(path: &Path, width: usize, height: usize, pixel: Pixel) {
    let mut bytes = format!("P6\n# test fixture\n{width} {height}\n255\n").into_bytes();
    for _ in 0..width * height {
        bytes.extend_from_slice(&[pixel.red, pixel.green, pixel.blue]);
    }
    std::fs::write(path, bytes).unwrap();
}

fn short_run(runtime_ms: u64) -> RunOptions {
    RunOptions {
        tick_interval: Duration::from_millis(2),
        runtime: Some(Duration::from_millis(runtime_ms)),
    }
}

#[test]
fn two_panels_from_disk_tile_the_surface() {
    let tmp = temp_dir("two_panels");
    let red = tmp.join("red.ppm");
    let blue = tmp.join("blue.ppm");
    write_solid_pixmap(&red, 4, 2, Pixel::new(255, 0, 0));
    write_solid_pixmap(&blue, 4, 2, Pixel::new(0, 0, 255));

    let mut pipeline = Pipeline::new(MemorySurface::new(8, 2));
    pipeline
        .add_source(
            "left",
            0,
            PlaylistSource::new(vec![red], Duration::from_millis(5)),
        )
        .unwrap();
    pipeline
        .add_source(
            "right",
            4,
            PlaylistSource::new(vec![blue], Duration::from_millis(5)),
        )
        .unwrap();

    let report = pipeline.run(&StopToken::new(), short_run(300)).unwrap();

    for y in 0..2 {
        for x in 0..4 {
            assert_eq!(report.sink.pixel(x, y), Some(Pixel::new(255, 0, 0)));
            assert_eq!(report.sink.pixel(x + 4, y), Some(Pixel::new(0, 0, 255)));
        }
    }
    assert!(report.producers.iter().all(|(_, s)| s.published == 1));
    assert_eq!(report.render.frames_adopted, 2);
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn broken_pixmap_leaves_display_running() {
    let tmp = temp_dir("broken");
    let good = tmp.join("good.ppm");
    let bad = tmp.join("bad.ppm");
    write_solid_pixmap(&good, 2, 1, Pixel::WHITE);
    std::fs::write(&bad, b"P6\n2 1\n128\n\0\0\0\0\0\0").unwrap();

    let mut pipeline = Pipeline::new(MemorySurface::new(4, 1));
    pipeline
        .add_source(
            "good",
            0,
            PlaylistSource::new(vec![good], Duration::from_millis(5)),
        )
        .unwrap();
    pipeline
        .add_source(
            "bad",
            2,
            PlaylistSource::new(vec![bad.clone()], Duration::from_millis(5)),
        )
        .unwrap();

    let report = pipeline.run(&StopToken::new(), short_run(150)).unwrap();

    assert_eq!(report.sink.pixel(0, 0), Some(Pixel::WHITE));
    assert_eq!(report.sink.pixel(2, 0), Some(Pixel::BLACK));
    let (_, bad_stats) = report
        .producers
        .iter()
        .find(|(name, _)| name == "bad")
        .unwrap();
    assert_eq!(bad_stats.published, 0);
    assert!(bad_stats.failures >= 1);
    assert!(pixmap::decode(&bad).is_err());
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn availability_change_blanks_the_panel() {
    let tmp = temp_dir("availability_run");
    let avail = tmp.join("availability");
    let eve = tmp.join("eve.ppm");
    write_solid_pixmap(&eve, 2, 2, Pixel::WHITE);
    std::fs::write(&avail, "eve 1\n").unwrap();

    let mut pipeline = Pipeline::new(MemorySurface::new(4, 2));
    pipeline
        .add_source(
            "eve",
            2,
            AvailabilitySource::new("eve", &avail, &eve, (2, 2), Duration::from_millis(5)),
        )
        .unwrap();

    let writer = {
        let avail = avail.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            std::fs::write(&avail, "eve 0\n").unwrap();
        })
    };
    let report = pipeline.run(&StopToken::new(), short_run(500)).unwrap();
    writer.join().unwrap();

    assert_eq!(report.sink.pixel(2, 0), Some(Pixel::BLACK));
    assert_eq!(report.sink.pixel(3, 1), Some(Pixel::BLACK));
    assert_eq!(report.producers[0].1.published, 2);
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn stop_token_from_another_thread_ends_an_unbounded_run() {
    let mut pipeline = Pipeline::new(MemorySurface::new(2, 1));
    let slot = pipeline.add_panel("manual", 0);
    slot.publish(pixmap::decode_from_reader(&b"P6\n1 1\n255\n\xff\xff\xff"[..]).unwrap());

    let stop = StopToken::new();
    let remote = stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.request_stop();
    });
    let report = pipeline
        .run(
            &stop,
            RunOptions {
                tick_interval: Duration::from_millis(2),
                runtime: None,
            },
        )
        .unwrap();
    stopper.join().unwrap();

    assert_eq!(report.sink.pixel(0, 0), Some(Pixel::WHITE));
    assert!(report.render.presents >= 1);
}
