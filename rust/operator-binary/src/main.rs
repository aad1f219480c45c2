use clap::Parser;
use hdfs_ha_crd::{
    constants::{APP_NAME, OPERATOR_NAME},
    HdfsCluster,
};
use hdfs_ha_operator::create_controller;
use stackable_operator::{
    cli::{Command, ProductOperatorRun},
    kube::CustomResourceExt,
};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[clap(about, author)]
struct Opts {
    #[clap(subcommand)]
    cmd: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    match opts.cmd {
        Command::Crd => {
            print!("{}", serde_yaml::to_string(&HdfsCluster::crd())?);
        }
        Command::Run(ProductOperatorRun {
            watch_namespace,
            tracing_target,
            cluster_info_opts,
            ..
        }) => {
            stackable_operator::logging::initialize_logging(
                "HDFS_HA_OPERATOR_LOG",
                APP_NAME,
                tracing_target,
            );
            stackable_operator::utils::print_startup_string(
                built_info::PKG_DESCRIPTION,
                built_info::PKG_VERSION,
                built_info::GIT_VERSION,
                built_info::TARGET,
                built_info::BUILT_TIME_UTC,
                built_info::RUSTC_VERSION,
            );

            let client = stackable_operator::client::initialize_operator(
                Some(OPERATOR_NAME.to_string()),
                &cluster_info_opts,
            )
            .await?;

            create_controller(client, watch_namespace).await;
        }
    };

    Ok(())
}
