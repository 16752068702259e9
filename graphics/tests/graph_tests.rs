//! End-to-end frame graph tests against the dummy backend.
//!
//! The dummy backend records every command into an inspectable log and can
//! defer submission completion, which lets these tests check barrier
//! placement, submission order, and fence-driven command list recycling
//! without GPU hardware.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rstest::rstest;

use vermilion_graphics::rhi::{DummyBackend, RecordedCommand, ResourceState};
use vermilion_graphics::types::{
    BufferDescriptor, BufferUsage, RasterPipelineDesc, TextureDescriptor, TextureFormat,
    TextureUsage,
};
use vermilion_graphics::{
    DoubleBuffered, GraphContext, GraphicsError, Handle, RenderGraph,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn color_desc(width: u32, height: u32) -> TextureDescriptor {
    TextureDescriptor::new_2d(
        width,
        height,
        TextureFormat::Rgba16Float,
        TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED,
    )
}

fn barrier(texture: &str, old: ResourceState, new: ResourceState) -> RecordedCommand {
    RecordedCommand::PipelineBarrier {
        texture: texture.to_string(),
        old,
        new,
    }
}

// ============================================================================
// Barrier Derivation
// ============================================================================

/// Three-pass chain: A creates and writes "T", B reads "T" and creates "U",
/// C reads "U".
///
/// Barriers must appear exactly where the data flow demands them: "T" is
/// initialized before A and made readable before B, "U" is initialized
/// before B's write and made readable before C. Nothing else.
#[test]
fn test_three_pass_chain_barriers() {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    graph.add_pass(
        "pass_a",
        Handle::INVALID,
        |t, builder| {
            *t = builder.create_texture("T", &color_desc(1280, 720));
            builder.set_pipeline(RasterPipelineDesc::new("a", "a.vert", "a.frag"));
        },
        |_, exec| {
            exec.cmd().draw(3, 1);
        },
    );
    graph.add_pass(
        "pass_b",
        (Handle::INVALID, Handle::INVALID),
        |(t, u), builder| {
            *t = builder.get_texture("T");
            builder.read_texture(*t);
            *u = builder.create_texture("U", &color_desc(1280, 720));
            builder.set_pipeline(RasterPipelineDesc::new("b", "b.vert", "b.frag"));
        },
        |(t, _), exec| {
            exec.bind_texture(0, *t).unwrap();
            exec.cmd().draw(3, 1);
        },
    );
    graph.add_pass(
        "pass_c",
        Handle::INVALID,
        |u, builder| {
            *u = builder.get_texture("U");
            builder.read_texture(*u);
        },
        |u, exec| {
            exec.bind_texture(0, *u).unwrap();
            exec.cmd().dispatch(160, 90, 1);
        },
    );

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);
    ctx.wait_idle();

    let batches = backend.submitted_batches();
    assert_eq!(batches.len(), 3, "one submission per pass, in A,B,C order");

    // Pass A: only the initialization of "T".
    assert_eq!(
        batches[0].barriers(),
        vec![&barrier(
            "T",
            ResourceState::Undefined,
            ResourceState::ColorAttachment
        )]
    );

    // Pass B: "T" becomes readable, "U" gets initialized. In that order,
    // because B declared its read before its create.
    assert_eq!(
        batches[1].barriers(),
        vec![
            &barrier(
                "T",
                ResourceState::ColorAttachment,
                ResourceState::ShaderRead
            ),
            &barrier(
                "U",
                ResourceState::Undefined,
                ResourceState::ColorAttachment
            ),
        ]
    );

    // Pass C: only "U" becoming readable.
    assert_eq!(
        batches[2].barriers(),
        vec![&barrier(
            "U",
            ResourceState::ColorAttachment,
            ResourceState::ShaderRead
        )]
    );

    // Registration order is execution order.
    assert!(batches[0].commands.contains(&RecordedCommand::BindRasterPipeline {
        name: "a".to_string()
    }));
    assert!(batches[1].commands.contains(&RecordedCommand::BindRasterPipeline {
        name: "b".to_string()
    }));
    assert!(batches[2]
        .commands
        .contains(&RecordedCommand::Dispatch { x: 160, y: 90, z: 1 }));
}

/// Repeated readers of the same texture must not produce repeated barriers.
#[rstest]
#[case::two_readers(2)]
#[case::four_readers(4)]
fn test_repeated_reads_are_barrier_free(#[case] reader_count: usize) {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    graph.add_pass(
        "producer",
        (),
        |_, builder| {
            builder.create_texture("shared", &color_desc(256, 256));
        },
        |_, exec| exec.cmd().draw(3, 1),
    );
    for i in 0..reader_count {
        graph.add_pass(
            format!("reader_{i}"),
            Handle::INVALID,
            |h, builder| {
                *h = builder.get_texture("shared");
                builder.read_texture(*h);
            },
            |h, exec| {
                exec.bind_texture(0, *h).unwrap();
            },
        );
    }

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);
    ctx.wait_idle();

    let batches = backend.submitted_batches();
    assert_eq!(batches.len(), reader_count + 1);

    // Initialization, then a single transition to shader-read; every
    // reader after the first finds the texture already readable.
    assert_eq!(batches[0].barriers().len(), 1);
    assert_eq!(batches[1].barriers().len(), 1);
    for batch in &batches[2..] {
        assert!(batch.barriers().is_empty());
    }
}

/// A pass that opted out of automatic write barriers gets none for its
/// writes, while its reads are still protected.
#[test]
fn test_skip_write_barriers_is_honored() {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    graph.add_pass(
        "producer",
        (),
        |_, builder| {
            builder.create_texture("input", &color_desc(64, 64));
        },
        |_, _| {},
    );
    graph.add_pass(
        "manual_sync",
        (Handle::INVALID, Handle::INVALID),
        |(input, output), builder| {
            *input = builder.get_texture("input");
            builder.read_texture(*input);
            *output = builder.create_texture("output", &color_desc(64, 64));
            builder.skip_texture_write_barriers();
        },
        |_, _| {},
    );

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);
    ctx.wait_idle();

    let batches = backend.submitted_batches();
    assert_eq!(
        batches[1].barriers(),
        vec![&barrier(
            "input",
            ResourceState::ColorAttachment,
            ResourceState::ShaderRead
        )],
        "read barrier emitted, write barrier suppressed"
    );
}

// ============================================================================
// Handle Lifetime
// ============================================================================

/// A handle obtained in one frame must fail to resolve after the next
/// build, even though the underlying texture survives.
#[test]
fn test_handle_goes_stale_across_frames() {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    let first_frame_handle = Rc::new(RefCell::new(None::<Handle>));
    {
        let captured = first_frame_handle.clone();
        graph.add_pass(
            "main",
            (),
            move |_, builder| {
                let handle = builder.create_texture("persistent", &color_desc(128, 128));
                captured.borrow_mut().get_or_insert(handle);
            },
            |_, _| {},
        );
    }

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);

    let stale = first_frame_handle.borrow().unwrap();
    assert!(ctx.registry().resolve(stale).is_ok());

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);
    ctx.wait_idle();

    assert_eq!(
        ctx.registry().resolve(stale).err(),
        Some(GraphicsError::StaleHandle)
    );
    // The texture itself was reused, not recreated.
    assert_eq!(backend.live_texture_count(), 1);
    assert!(backend.destroyed_texture_names().is_empty());
}

/// Changing a texture's descriptor between frames recreates it and the old
/// backend object is destroyed exactly once.
#[test]
fn test_descriptor_change_recreates_texture() {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    let size = Rc::new(RefCell::new(256u32));
    {
        let size = size.clone();
        graph.add_pass(
            "main",
            (),
            move |_, builder| {
                let extent = *size.borrow();
                builder.create_texture("resizable", &color_desc(extent, extent));
            },
            |_, _| {},
        );
    }

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);

    *size.borrow_mut() = 512;
    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);
    ctx.wait_idle();

    assert_eq!(backend.live_texture_count(), 1);
    assert_eq!(backend.destroyed_texture_names(), vec!["resizable"]);
}

/// Recreating a texture while earlier frames are still in flight must not
/// destroy the old backend object until their fences signal.
#[test]
fn test_recreation_defers_destroy_until_gpu_idle() {
    init_logger();
    let backend = Arc::new(DummyBackend::with_manual_completion());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    let size = Rc::new(RefCell::new(256u32));
    {
        let size = size.clone();
        graph.add_pass(
            "main",
            (),
            move |_, builder| {
                let extent = *size.borrow();
                builder.create_texture("resizable", &color_desc(extent, extent));
            },
            |_, exec| exec.cmd().draw(3, 1),
        );
    }

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);

    // Frame 1 is still on the GPU when frame 2 resizes the texture.
    *size.borrow_mut() = 512;
    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);

    assert!(
        backend.destroyed_texture_names().is_empty(),
        "old texture destroyed while an in-flight frame may reference it"
    );
    assert_eq!(backend.live_texture_count(), 2);
    assert_eq!(ctx.registry().retired_count(), 1);

    backend.complete_all();
    ctx.wait_idle();

    assert_eq!(backend.destroyed_texture_names(), vec!["resizable"]);
    assert_eq!(backend.live_texture_count(), 1);
    assert_eq!(ctx.registry().retired_count(), 0);
}

// ============================================================================
// Named Buffers
// ============================================================================

/// A buffer registered by name during setup is resolvable and bindable
/// during execution, like textures are.
#[test]
fn test_named_buffer_flows_to_binding() {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    graph.add_pass(
        "geometry",
        Handle::INVALID,
        |vb, builder| {
            *vb = builder.create_buffer(
                "quad_vertices",
                &BufferDescriptor {
                    size: 256,
                    stride: 16,
                    usage: BufferUsage::VERTEX,
                },
            );
            builder.create_texture("target", &color_desc(64, 64));
        },
        |vb, exec| {
            exec.bind_vertex_buffer(0, *vb).unwrap();
            exec.cmd().draw(6, 1);
        },
    );

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);
    ctx.wait_idle();

    assert_eq!(backend.live_buffer_count(), 1);
    let commands = &backend.submitted_batches()[0].commands;
    assert!(commands.contains(&RecordedCommand::SetVertexBuffer {
        slot: 0,
        buffer: "quad_vertices".to_string(),
    }));
}

// ============================================================================
// Command List Recycling
// ============================================================================

/// With submissions left incomplete, executing again must take fresh
/// command lists instead of recycling in-flight ones.
#[test]
fn test_no_command_list_reuse_before_completion() {
    init_logger();
    let backend = Arc::new(DummyBackend::with_manual_completion());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    graph.add_pass(
        "main",
        (),
        |_, builder| {
            builder.create_texture("target", &color_desc(64, 64));
        },
        |_, exec| exec.cmd().draw(3, 1),
    );

    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);
    let free_after_first = ctx.pool().free_count();

    // GPU has not finished frame 1; frame 2 must not get frame 1's list.
    ctx.begin_frame();
    let fence = graph.execute(&mut ctx).unwrap();
    ctx.end_frame(fence);

    assert_eq!(backend.pending_count(), 2);
    assert_eq!(ctx.pool().pending_submissions(), 2);
    assert_eq!(ctx.pool().free_count(), free_after_first - 1);

    backend.complete_all();
    ctx.wait_idle();
    assert_eq!(ctx.pool().pending_submissions(), 0);
}

/// Frames keep recycling through the pool without growing it once fences
/// complete promptly.
#[rstest]
#[case::single_frame(1)]
#[case::double_buffered(2)]
#[case::triple_buffered(3)]
fn test_steady_state_frames(#[case] frames_in_flight: usize) {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), frames_in_flight);
    let mut graph = RenderGraph::new();

    graph.add_pass(
        "main",
        (),
        |_, builder| {
            builder.create_texture("target", &color_desc(64, 64));
        },
        |_, exec| exec.cmd().draw(3, 1),
    );

    for _ in 0..10 {
        ctx.begin_frame();
        let fence = graph.execute(&mut ctx).unwrap();
        ctx.end_frame(fence);
    }
    ctx.wait_idle();

    assert_eq!(ctx.frame_index(), 10);
    assert_eq!(backend.submission_count(), 10);
    assert_eq!(ctx.pool().allocator_count(), 1, "pool never had to grow");
    ctx.pool().assert_quiescent();
}

// ============================================================================
// Double-Buffered Frame Data
// ============================================================================

/// Rendering a frame reads the data written one frame earlier, never the
/// data being written now.
#[test]
fn test_frame_data_shift_by_one() {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    let frame_data = Rc::new(RefCell::new(DoubleBuffered::new(0u64, 0u64)));
    let observed = Rc::new(RefCell::new(Vec::new()));
    {
        let frame_data = frame_data.clone();
        let observed = observed.clone();
        graph.add_pass(
            "consume",
            (),
            |_, builder| {
                builder.create_texture("target", &color_desc(64, 64));
            },
            move |_, exec| {
                observed.borrow_mut().push(*frame_data.borrow().current());
                exec.cmd().draw(3, 1);
            },
        );
    }

    for frame in 1..=4u64 {
        ctx.begin_frame();
        *frame_data.borrow_mut().pending_mut() = frame;
        let fence = graph.execute(&mut ctx).unwrap();
        ctx.end_frame(fence);
        frame_data.borrow_mut().swap();
    }
    ctx.wait_idle();

    // Frame N rendered with frame N-1's data (0 = initial value).
    assert_eq!(*observed.borrow(), vec![0, 1, 2, 3]);
    assert_eq!(frame_data.borrow().swap_count(), 4);
}

/// The swap can also be driven from a sync point between a writer and a
/// reader pass; it then happens exactly once per frame, and the reader
/// sees what the writer produced earlier in the same graph run.
#[test]
fn test_sync_point_swaps_frame_data_once() {
    init_logger();
    let backend = Arc::new(DummyBackend::new());
    let mut ctx = GraphContext::new(backend.clone(), 2);
    let mut graph = RenderGraph::new();

    let frame_data = Rc::new(RefCell::new(DoubleBuffered::new(0u64, 0u64)));
    let observed = Rc::new(RefCell::new(Vec::new()));

    {
        let frame_data = frame_data.clone();
        graph.add_pass(
            "simulate",
            (),
            |_, _| {},
            move |_, exec| {
                *frame_data.borrow_mut().pending_mut() = exec.frame_index();
            },
        );
    }
    {
        let frame_data = frame_data.clone();
        graph.add_sync_point("swap_frame_data", move || {
            let mut data = frame_data.borrow_mut();
            let marker = data.swap_marker();
            data.swap();
            assert_eq!(data.swaps_since(marker), 1, "one swap per frame");
        });
    }
    {
        let frame_data = frame_data.clone();
        let observed = observed.clone();
        graph.add_pass(
            "render",
            (),
            |_, builder| {
                builder.create_texture("target", &color_desc(64, 64));
            },
            move |_, exec| {
                observed.borrow_mut().push(*frame_data.borrow().current());
                exec.cmd().draw(3, 1);
            },
        );
    }

    let start = frame_data.borrow().swap_marker();
    for _ in 0..3 {
        ctx.begin_frame();
        let fence = graph.execute(&mut ctx).unwrap();
        ctx.end_frame(fence);
    }
    ctx.wait_idle();

    // The reader ran after the swap each frame, so it saw that frame's
    // data, and the swap happened exactly once per executed frame.
    assert_eq!(*observed.borrow(), vec![1, 2, 3]);
    assert_eq!(frame_data.borrow().swaps_since(start), 3);
}
