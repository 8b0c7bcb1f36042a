//! GPU backend: wgpu compute shaders over storage buffers
//!
//! Results stay host side. Every operation uploads its input, encodes one
//! compute pass per kernel invocation, and reads the output back before
//! returning. Pipelines are compiled on first use and cached by shader name.

use super::shaders::{self, WORKGROUP_SIZE};
use super::{Backend, GammaMode};
use crate::context::{Device, PowerPreference};
use crate::error::{ComError, Result};
use crate::pad::PaddingMethod;
use crate::result::ResultBuffer;
use crate::texture_pool::TexturePool;
use bytemuck::{Pod, Zeroable};
use glam::IVec2;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Uniform block bound at binding 2 of every shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct KernelParams {
    input_size: [i32; 2],
    output_size: [i32; 2],
    offset: [i32; 2],
    step_size: i32,
    _padding: i32,
}

impl KernelParams {
    fn new(input_size: IVec2, output_size: IVec2) -> Self {
        Self {
            input_size: input_size.to_array(),
            output_size: output_size.to_array(),
            offset: [0; 2],
            step_size: 0,
            _padding: 0,
        }
    }
}

pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: Mutex<HashMap<String, Arc<wgpu::ComputePipeline>>>,
}

impl GpuBackend {
    /// Create a headless device; fails if no adapter is available
    pub fn new(power_preference: PowerPreference) -> Result<Self> {
        pollster::block_on(Self::new_async(power_preference))
    }

    async fn new_async(power_preference: PowerPreference) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let power_preference = match power_preference {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ComError::GpuUnavailable)?;

        let adapter_name = adapter.get_info().name;
        let limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("compositor"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_storage_buffer_binding_size: limits.max_storage_buffer_binding_size,
                        max_buffer_size: limits.max_buffer_size,
                        max_compute_workgroups_per_dimension: limits
                            .max_compute_workgroups_per_dimension,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .map_err(|err| ComError::DeviceRequest(err.to_string()))?;

        info!("GPU compositing on {adapter_name}");

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compositor_bgl"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compositor_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            device,
            queue,
            adapter_name,
            bind_group_layout,
            pipeline_layout,
            pipelines: Mutex::new(HashMap::new()),
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Compiled pipeline of the named shader
    pub fn get_shader(&self, name: &str) -> Result<Arc<wgpu::ComputePipeline>> {
        let mut pipelines = self.pipelines.lock();
        if let Some(pipeline) = pipelines.get(name) {
            return Ok(Arc::clone(pipeline));
        }

        let source =
            shaders::shader_source(name).ok_or_else(|| ComError::ShaderNotFound(name.to_string()))?;
        debug!("compiling shader {name}");

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline = Arc::new(self.device.create_compute_pipeline(
            &wgpu::ComputePipelineDescriptor {
                label: Some(name),
                layout: Some(&self.pipeline_layout),
                module: &module,
                entry_point: "main",
                compilation_options: Default::default(),
            },
        ));

        pipelines.insert(name.to_string(), Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Largest storage buffer, in bytes, the device binds
    pub fn max_binding_size(&self) -> u64 {
        let limits = self.device.limits();
        u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size)
    }

    /// Fail before creating buffers the device cannot bind
    fn check_binding_size(&self, size: u64) -> Result<()> {
        check_binding_size(size, &self.device.limits())
    }

    fn upload(&self, label: &str, result: &ResultBuffer) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: result.bytes(),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        })
    }

    fn storage_buffer(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    fn bind_group(
        &self,
        input: &wgpu::Buffer,
        output: &wgpu::Buffer,
        params: &KernelParams,
    ) -> wgpu::BindGroup {
        let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("compositor_params"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("compositor_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        })
    }

    fn encode_pass(
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        size: IVec2,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("compositor_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(
            (size.x as u32).div_ceil(WORKGROUP_SIZE),
            (size.y as u32).div_ceil(WORKGROUP_SIZE),
            1,
        );
    }

    /// Copy `source` into `output` through a staging buffer and wait for it
    fn read_back(
        &self,
        mut encoder: wgpu::CommandEncoder,
        source: &wgpu::Buffer,
        output: &mut ResultBuffer,
    ) -> Result<()> {
        let size = output.bytes().len() as u64;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("compositor_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|err| ComError::BufferMap(err.to_string()))?
            .map_err(|err| ComError::BufferMap(err.to_string()))?;

        {
            let mapped = slice.get_mapped_range();
            output.bytes_mut().copy_from_slice(&mapped);
        }
        staging.unmap();
        Ok(())
    }

    /// Run a single pass shader from `input` into `output`
    fn run_kernel(
        &self,
        shader: &str,
        input: &ResultBuffer,
        output: &mut ResultBuffer,
        params: KernelParams,
    ) -> Result<()> {
        let size = output.domain().size;
        if output.domain().pixel_count() == 0 || input.domain().pixel_count() == 0 {
            return Ok(());
        }

        self.check_binding_size(input.bytes().len() as u64)?;
        self.check_binding_size(output.bytes().len() as u64)?;

        let pipeline = self.get_shader(shader)?;
        let input_buffer = self.upload("compositor_input", input);
        let output_buffer = self.storage_buffer("compositor_output", output.bytes().len() as u64);
        let bind_group = self.bind_group(&input_buffer, &output_buffer, &params);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(shader),
        });
        Self::encode_pass(&mut encoder, &pipeline, &bind_group, size);
        self.read_back(encoder, &output_buffer, output)
    }
}

fn check_binding_size(size: u64, limits: &wgpu::Limits) -> Result<()> {
    let limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    if size > limit {
        return Err(ComError::BufferTooLarge { size, limit });
    }
    Ok(())
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl Backend for GpuBackend {
    fn device(&self) -> Device {
        Device::Gpu
    }

    fn name(&self) -> &str {
        "gpu"
    }

    fn gamma(&self, input: &ResultBuffer, output: &mut ResultBuffer, mode: GammaMode) -> Result<()> {
        let shader = match mode {
            GammaMode::Correct => shaders::GAMMA_CORRECT,
            GammaMode::Uncorrect => shaders::GAMMA_UNCORRECT,
        };
        let size = input.domain().size;
        self.run_kernel(shader, input, output, KernelParams::new(size, size))
    }

    fn pad(
        &self,
        input: &ResultBuffer,
        output: &mut ResultBuffer,
        size: IVec2,
        method: PaddingMethod,
    ) -> Result<()> {
        let shader = shaders::pad_shader_name(method, input.ty().format());
        let params = KernelParams {
            offset: size.to_array(),
            ..KernelParams::new(input.domain().size, output.domain().size)
        };
        self.run_kernel(&shader, input, output, params)
    }

    fn jump_flooding(
        &self,
        _pool: &TexturePool,
        input: &ResultBuffer,
        output: &mut ResultBuffer,
        step_sizes: &[i32],
    ) -> Result<()> {
        let size = input.domain().size;
        if step_sizes.is_empty() || input.domain().pixel_count() == 0 {
            output.share_data(input);
            return Ok(());
        }

        self.check_binding_size(input.bytes().len() as u64)?;
        output.allocate_texture(input.domain());
        let pipeline = self.get_shader(shaders::JUMP_FLOODING_PASS)?;

        // Ping-pong between the uploaded input and one scratch buffer
        let buffers = [
            self.upload("jump_flooding_a", input),
            self.storage_buffer("jump_flooding_b", input.bytes().len() as u64),
        ];
        let bind_groups: Vec<_> = step_sizes
            .iter()
            .enumerate()
            .map(|(pass, &step_size)| {
                let params = KernelParams {
                    step_size,
                    ..KernelParams::new(size, size)
                };
                self.bind_group(&buffers[pass % 2], &buffers[(pass + 1) % 2], &params)
            })
            .collect();

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("jump_flooding"),
        });
        for bind_group in &bind_groups {
            Self::encode_pass(&mut encoder, &pipeline, bind_group, size);
        }
        debug!("jump flooding encoded {} passes", bind_groups.len());

        self.read_back(encoder, &buffers[step_sizes.len() % 2], output)
    }
}
