use fitd_engine::math::distance_to_point;
use fitd_engine::track::TRACK_SCRIPTED;
use fitd_engine::world::{
    AF_ANIMATED, AF_BOXIFY, AF_DRAWABLE, AF_MOVABLE, ANIM_REPEAT, Actor, World,
};
use fitd_engine::zv::MAX_OBJECT_COLLISIONS;
use fitd_engine::{RecordingHost, Zv};
use fitd_formats::{
    Animation, Body, BodyGroup, BoneState, Edition, INFO_ANIM, Keyframe, RoomData, WorldObject,
};

// First-release LIFE opcodes.
const DO_MOVE: i16 = 0x00;
const END: i16 = 0x0C;

// First-release track opcodes.
const TL_GOTO: i16 = 1;
const TL_END: i16 = 2;
const TL_WALK: i16 = 5;
const TL_STOP: i16 = 7;

const BODY: i16 = 1;
const WALK: i16 = 2;

fn walker_body() -> Body {
    Body {
        flags: INFO_ANIM,
        zv: [-100, 100, -1000, 0, -100, 100],
        scratch_size: 0,
        vertices: vec![[0; 3]],
        groups: vec![BodyGroup {
            start_vertex: 0,
            vertex_count: 1,
            base_vertex: 0,
            parent: -1,
            index: 0,
            state: BoneState::default(),
        }],
    }
}

/// One keyframe that moves the model `distance` units forward over
/// `length` ticks.
fn walk_cycle(length: u16, distance: i16) -> Animation {
    Animation {
        bone_count: 1,
        keyframes: vec![Keyframe {
            length,
            step: [0, 0, -distance],
            bones: vec![BoneState::default()],
        }],
    }
}

/// A first-release world with one room and `count` actors bound to world
/// objects in slots `0..count`, all standing at the origin.
fn world(count: usize) -> World {
    let mut world = World::new(Edition::Aitd1);
    world.rooms = vec![RoomData::default()];
    world.view_list = vec![0];
    world.resources.bodies.insert(BODY, walker_body());
    for slot in 0..count {
        world.objects.push(WorldObject {
            obj_index: slot as i16,
            stage: 0,
            room: 0,
            ..WorldObject::default()
        });
        world.actors[slot] = Actor {
            index_in_world: slot as i16,
            stage: 0,
            room: 0,
            zv: Zv::around([0, 0, 0], 100),
            ..Actor::default()
        };
    }
    world
}

#[test]
fn scripted_track_walks_to_its_goto_point() {
    let mut world = world(1);
    world.resources.anims.insert(WALK, walk_cycle(4, 40));
    world
        .resources
        .tracks
        .insert(0, vec![TL_WALK, TL_GOTO, 0, 1000, 1000, TL_STOP, TL_END]);
    world.resources.lives.insert(0, vec![DO_MOVE, END]);
    {
        let actor = &mut world.actors[0];
        actor.body_num = BODY;
        actor.flags = AF_ANIMATED;
        actor.anim = WALK;
        actor.anim_type = ANIM_REPEAT;
        actor.num_of_frames = 1;
        actor.end_frame = false;
        actor.end_anim = false;
        // Facing +X +Z, straight at the target.
        actor.beta = 384;
        actor.life = 0;
        actor.life_mode = 0;
        actor.track_mode = TRACK_SCRIPTED;
        actor.track_number = 0;
    }

    let mut host = RecordingHost::new();
    let distance = |world: &World| {
        let [x, _, z] = world.actors[0].stepped_position();
        distance_to_point(x, z, 1000, 1000)
    };
    let mut previous = distance(&world);
    let mut ticks = 0;
    while world.actors[0].position_in_track < 5 {
        assert!(ticks < 400, "never reached the GOTO point (distance {previous})");
        let faults = world.tick(&mut host);
        assert!(faults.is_empty(), "{faults:?}");
        let now = distance(&world);
        if world.actors[0].position_in_track < 5 {
            assert!(now <= previous, "distance grew from {previous} to {now}");
        }
        previous = now;
        ticks += 1;
    }
    assert!(previous < 400);
    assert_eq!(world.actors[0].speed, 4);

    // STOP then END.
    world.tick(&mut host);
    assert_eq!(world.actors[0].speed, 0);
    assert_eq!(world.actors[0].position_in_track, 6);
    world.tick(&mut host);
    let actor = &world.actors[0];
    assert_eq!(actor.speed, 0);
    assert_eq!(actor.track_mode, 0);
    assert_eq!(actor.track_number, -1);
}

#[test]
fn walking_actor_pushes_movable_actor() {
    let mut world = world(2);
    world.resources.anims.insert(WALK, walk_cycle(10, 100));
    world.timer = 5;
    {
        let pusher = &mut world.actors[0];
        pusher.body_num = BODY;
        pusher.flags = AF_ANIMATED;
        pusher.anim = WALK;
        pusher.anim_type = ANIM_REPEAT;
        pusher.num_of_frames = 1;
        pusher.end_frame = false;
    }
    {
        let crate_actor = &mut world.actors[1];
        crate_actor.flags = AF_MOVABLE | AF_BOXIFY | AF_DRAWABLE;
        crate_actor.set_position([0, 0, -200]);
        crate_actor.zv = Zv::around([0, 0, -200], 100);
    }

    let faults = world.tick(&mut RecordingHost::new());
    assert!(faults.is_empty());

    // Half of the keyframe has elapsed: 50 units towards -Z.
    assert_eq!(world.actors[0].step, [0, 0, -50]);
    let pushed = &world.actors[1];
    assert_eq!(pushed.room_pos, [0, 0, -250]);
    assert_eq!(pushed.world, [0, 0, -250]);
    assert_eq!(pushed.zv, Zv::around([0, 0, -250], 100));
    assert_ne!(pushed.flags & AF_ANIMATED, 0);
    assert_eq!(pushed.flags & AF_BOXIFY, 0);
    assert_eq!(pushed.col_by, 0);
    assert_eq!(world.actors[0].col[0], 1);
}

#[test]
fn collision_report_stops_at_three_actors() {
    let mut world = world(5);
    world.actors[0].flags = AF_ANIMATED;

    world.tick(&mut RecordingHost::new());

    assert_eq!(MAX_OBJECT_COLLISIONS, 3);
    assert_eq!(world.actors[0].col, [1, 2, 3]);
    for slot in 1..4 {
        assert_eq!(world.actors[slot].col_by, 0, "slot {slot}");
    }
    assert_eq!(world.actors[4].col_by, -1);
}
