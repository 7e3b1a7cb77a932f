fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    if std::env::var_os("PROTOC_INCLUDE").is_none() {
        std::env::set_var("PROTOC_INCLUDE", protoc_bin_vendored::include_path()?);
    }
    tonic_build::compile_protos("proto/prediction.proto")?;
    Ok(())
}
