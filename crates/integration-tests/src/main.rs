#[cfg(test)]
mod provider;

fn main() {
    println!("Run me via `cargo nextest run` or `cargo test`");
}
