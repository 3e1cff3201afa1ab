fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().compile(&["proto/surfstore.proto"], &["proto"])?;
    Ok(())
}
