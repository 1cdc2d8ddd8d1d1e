use std::env;
use std::error::Error;
use tqdm::Iter;

use candle_core::{Device, Tensor};
use log::info;
use spiking_net::config::PipelineConfig;
use spiking_net::dataset::signals::RandomSignals;
use spiking_net::{Layer, Network, rng, spikegen, utils};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let device = Device::new_cuda(0).unwrap_or(Device::Cpu);
    let cpu = Device::Cpu;

    let args: Vec<String> = env::args().collect();
    let cfg = match args.get(1) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut rng = match cfg.seed {
        Some(seed) => rng::seeded(seed),
        None => rng::from_entropy(),
    };

    let mut net = cfg.build_network(&mut rng)?;
    for info in net.summary() {
        info!(
            "layer {}: {} {} -> {}",
            info.index, info.kind, info.in_width, info.out_width
        );
    }
    for (i, layer) in net.layers().iter().enumerate() {
        if let Layer::Dense(d) = layer {
            let s = d.weight_stats();
            info!(
                "layer {i} weights: mean {:.4}, std {:.4}, min {:.4}, max {:.4} ({} weights)",
                s.mean, s.std, s.min, s.max, s.num_weights
            );
        }
    }
    let n_out = net.output_width(cfg.n_inputs)?;

    let mut last = None;
    let mut rate_sum = 0.0;
    for trial in (0..cfg.trials).tqdm() {
        // make some [S, N] inputs in [0,1] and rate-encode to [T, S, N]
        let signals = RandomSignals::new(cfg.n_samples, cfg.n_inputs, &mut rng, &device)?;
        let spikes_in = spikegen::rate(signals.analog(), cfg.n_steps, &mut rng)?;

        let spk_out = forward(&mut net, &spikes_in, &cfg)?;

        let first: Vec<f32> = spk_out
            .get(0)?
            .get(0)?
            .narrow(0, 0, n_out.min(12))?
            .to_device(&cpu)?
            .to_vec1()?;
        let first: Vec<String> = first.iter().map(|v| format!("{v:.0}")).collect();
        println!("trial {trial}: spk_out[t=0, s=0, :12] = [{}]", first.join(", "));

        let mean_rate = utils::firing_rates(&spk_out)?
            .get(0)?
            .mean_all()?
            .to_device(&cpu)?
            .to_scalar::<f32>()?;
        println!(
            "trial {trial}: mean firing rate (sample 0 across {n_out} outputs): {mean_rate:.3}"
        );
        rate_sum += mean_rate;
        last = Some(spk_out);
    }

    if cfg.trials > 1 {
        println!(
            "mean firing rate over {} trials: {:.3}",
            cfg.trials,
            rate_sum / cfg.trials as f32
        );
    }

    if let (Some(path), Some(spk_out)) = (&cfg.spikes_csv, &last) {
        let n = utils::save_spikes_csv(path, spk_out)?;
        println!("wrote {n} spikes to {}", path.display());
    }

    println!("Done");
    Ok(())
}

fn forward(
    net: &mut Network,
    spikes_in: &Tensor,
    cfg: &PipelineConfig,
) -> spiking_net::Result<Tensor> {
    if cfg.workers <= 1 {
        return net.forward_sequence(spikes_in);
    }
    let (n_steps, n_samples, n_inputs) = spikes_in.dims3()?;
    let flat = spikes_in.flatten_all()?.to_vec1::<f32>()?;
    let out = net.forward_parallel(&flat, n_steps, n_samples, n_inputs, cfg.workers)?;
    let n_out = net.output_width(n_inputs)?;
    Ok(Tensor::from_vec(
        out,
        (n_steps, n_samples, n_out),
        spikes_in.device(),
    )?)
}
