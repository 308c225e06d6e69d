use image::{Rgb, RgbImage};

fn main() -> anyhow::Result<()> {
    let (width, height) = (320u32, 240u32);

    // Sky over grass with a brick block and a dark shadow patch
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (200..280).contains(&x) && (90..170).contains(&y) {
            Rgb([178, 34, 34])
        } else if (40..110).contains(&x) && (170..220).contains(&y) {
            Rgb([25, 25, 30])
        } else if y < height / 2 {
            Rgb([135, 206, 235])
        } else {
            Rgb([34, 139, 34])
        }
    });

    img.save("scene.jpg")?;
    println!("Created scene.jpg ({}x{} synthetic scene)", width, height);
    Ok(())
}
