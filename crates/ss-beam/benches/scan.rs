use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ss_beam::{BeamSampler, FanGeometry, PeakDetector};
use ss_core::Image;

fn build_speckled_fan(width: usize, height: usize) -> Image<u16> {
    let mut state = 0x2545_f491_u32;
    Image::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let speckle = (state % 40) as u16;
        let dx = x as f32 - 0.6 * width as f32;
        let dy = y as f32 - 0.4 * height as f32;
        if dx * dx + dy * dy < 400.0 {
            1500 + speckle
        } else {
            40 + speckle
        }
    })
}

fn bench_scan_all_beams(c: &mut Criterion) {
    let img = build_speckled_fan(1200, 512);
    let geom = FanGeometry::new(1200, 512, 720, 130.0, 20, 1);
    let mut det = PeakDetector::new(110, 5);
    let mut out = Vec::with_capacity(3000);

    for ray in geom.beams() {
        let sampler = BeamSampler::new(img.as_view(), ray);
        det.scan_beam(&sampler, geom.n_bins(), &mut out)
            .expect("fan fits image");
    }
    assert!(!out.is_empty(), "scene must produce peaks");

    c.bench_function("ss_beam_scan_720x492", |b| {
        b.iter(|| {
            out.clear();
            for ray in geom.beams() {
                let sampler = BeamSampler::new(img.as_view(), ray);
                det.scan_beam(&sampler, black_box(geom.n_bins()), &mut out)
                    .expect("fan fits image");
            }
            black_box(out.len());
        });
    });
}

criterion_group!(benches, bench_scan_all_beams);
criterion_main!(benches);
