//! End to end scenarios driven through a scripted X connection
use quay::{
    autoprops::{AutoProperties, AutoProperty, ClassHint, Group, Matcher},
    core::{manage, Config, State},
    ctrl::encode_command,
    x::{
        event::{ClientEventMask, ClientMessage, ClientMessageData},
        property::{MapState, Prop, WindowAttributes},
        Atom, StubXConn, WinType, XEvent,
    },
    Rect, Xid,
};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

// A conn that serves scripted per-window properties and records everything
// the window manager writes back.
#[derive(Default)]
struct ScriptedConn {
    next_window: Cell<u32>,
    class_hints: RefCell<HashMap<Xid, (String, String)>>,
    written: RefCell<HashMap<(Xid, String), Prop>>,
}

impl ScriptedConn {
    fn new() -> Self {
        Self {
            next_window: Cell::new(10_000),
            ..Default::default()
        }
    }

    fn with_class(self, id: u32, name: &str, class: &str) -> Self {
        self.class_hints
            .borrow_mut()
            .insert(Xid::from(id), (name.to_string(), class.to_string()));
        self
    }

    fn written_prop(&self, id: Xid, name: &str) -> Option<Prop> {
        self.written
            .borrow()
            .get(&(id, name.to_string()))
            .cloned()
    }
}

impl StubXConn for ScriptedConn {
    fn stub_create_window(&self, _: WinType, _: Rect, _: bool) -> quay::Result<Xid> {
        let id = self.next_window.get();
        self.next_window.set(id + 1);
        Ok(Xid::from(id))
    }

    fn stub_get_window_attributes(&self, _: Xid) -> quay::Result<WindowAttributes> {
        Ok(WindowAttributes::new(false, MapState::Viewable))
    }

    fn stub_client_geometry(&self, _: Xid) -> quay::Result<Rect> {
        Ok(Rect::new(0, 0, 400, 300))
    }

    fn stub_get_prop(&self, id: Xid, prop_name: &str) -> quay::Result<Option<Prop>> {
        if prop_name == Atom::WmClass.as_ref() {
            if let Some((name, class)) = self.class_hints.borrow().get(&id) {
                return Ok(Some(Prop::UTF8String(vec![name.clone(), class.clone()])));
            }
        }

        Ok(None)
    }

    fn stub_set_prop(&self, id: Xid, name: &str, val: Prop) -> quay::Result<()> {
        self.written
            .borrow_mut()
            .insert((id, name.to_string()), val);
        Ok(())
    }
}

fn grouping_rules() -> AutoProperties {
    let mut rule = AutoProperty::new(Matcher::for_class("Term").unwrap());
    rule.group = Some(Group {
        name: "work".into(),
        ..Default::default()
    });

    AutoProperties::new(vec![rule], vec![], vec![], vec![], HashMap::new())
}

#[test]
fn workspaces_back_and_forth() {
    let conn = ScriptedConn::new();
    let mut state = State::try_new(Config::default(), &conn).unwrap();
    state.workspaces.set_back_and_forth(true);
    assert_eq!(state.workspaces.active(), 0);

    assert!(state.goto_workspace(&conn, 1, false, false).unwrap());
    assert_eq!(state.workspaces.active(), 1);

    // re-selecting the current workspace goes back to the previous one
    assert!(state.goto_workspace(&conn, 1, false, false).unwrap());
    assert_eq!(state.workspaces.active(), 0);
}

#[test]
fn goto_workspace_publishes_current_desktop() {
    let conn = ScriptedConn::new();
    let mut state = State::try_new(Config::default(), &conn).unwrap();
    let root = state.root;

    state.goto_workspace(&conn, 2, false, false).unwrap();

    assert_eq!(
        conn.written_prop(root, Atom::NetCurrentDesktop.as_ref()),
        Some(Prop::Cardinal(vec![2]))
    );
}

#[test]
fn autoproperty_grouping_lands_in_one_frame() {
    let conn = ScriptedConn::new()
        .with_class(1, "term", "Term")
        .with_class(2, "term", "Term");
    let mut state = State::try_new(Config::default(), &conn).unwrap();
    state.autoprops = grouping_rules();

    manage::manage_window(&mut state, &conn, Xid::from(1u32), quay::autoprops::ApplyOn::NEW)
        .unwrap();
    manage::manage_window(&mut state, &conn, Xid::from(2u32), quay::autoprops::ApplyOn::NEW)
        .unwrap();

    assert_eq!(state.frames.len(), 1, "both clients share one frame");

    let frame = state.frames.values().next().unwrap();
    assert_eq!(frame.clients(), &[Xid::from(1u32), Xid::from(2u32)]);
    assert_eq!(
        frame.active_client(),
        Some(Xid::from(2u32)),
        "second client becomes the active tab"
    );
}

#[test]
fn grouped_clients_publish_one_client_list() {
    let conn = ScriptedConn::new()
        .with_class(1, "term", "Term")
        .with_class(2, "term", "Term");
    let mut state = State::try_new(Config::default(), &conn).unwrap();
    state.autoprops = grouping_rules();
    let root = state.root;

    manage::manage_window(&mut state, &conn, Xid::from(1u32), quay::autoprops::ApplyOn::NEW)
        .unwrap();
    manage::manage_window(&mut state, &conn, Xid::from(2u32), quay::autoprops::ApplyOn::NEW)
        .unwrap();

    match conn.written_prop(root, Atom::NetClientList.as_ref()) {
        Some(Prop::Window(mut ids)) => {
            ids.sort();
            assert_eq!(ids, vec![Xid::from(1u32), Xid::from(2u32)]);
        }
        other => panic!("unexpected client list: {other:?}"),
    }
}

#[test]
fn detach_split_migrates_inactive_tab() {
    let conn = ScriptedConn::new()
        .with_class(1, "term", "Term")
        .with_class(2, "term", "Term");
    let mut state = State::try_new(Config::default(), &conn).unwrap();
    state.autoprops = grouping_rules();

    manage::manage_window(&mut state, &conn, Xid::from(1u32), quay::autoprops::ApplyOn::NEW)
        .unwrap();
    manage::manage_window(&mut state, &conn, Xid::from(2u32), quay::autoprops::ApplyOn::NEW)
        .unwrap();

    let fid = state.frames.keys().copied().next().unwrap();
    state.frame_mut(fid).unwrap().activate_client(Xid::from(1u32));
    manage::set_frame_geometry(&mut state, &conn, fid, Rect::new(100, 200, 500, 400)).unwrap();

    let new_fid = manage::detach_split(&mut state, &conn, fid, 0.5, true)
        .unwrap()
        .expect("a frame was split off");

    let old = state.frame(fid).unwrap();
    let new = state.frame(new_fid).unwrap();

    assert_eq!(old.geometry, Rect::new(100, 400, 500, 200));
    assert_eq!(new.geometry, Rect::new(100, 200, 500, 200));
    assert_eq!(old.clients(), &[Xid::from(1u32)]);
    assert_eq!(new.clients(), &[Xid::from(2u32)]);
}

#[test]
fn control_channel_executes_one_action_per_command() {
    let conn = ScriptedConn::new();
    let mut state = State::try_new(Config::default(), &conn).unwrap();

    let cmd = "GotoWorkspace 2 please and thank you kindly!!";
    assert_eq!(cmd.len(), 45);

    let msgs = encode_command(cmd);
    assert_eq!(msgs.len(), 3);

    for data in msgs {
        let m = ClientMessage::new(
            state.root,
            ClientEventMask::NoEventMask,
            Atom::QuayCmd.as_ref(),
            ClientMessageData::U8(data),
        );
        quay::core::handle::x_event(XEvent::ClientMessage(m), &mut state, &conn).unwrap();
    }

    assert_eq!(state.workspaces.active(), 2);
}

#[test]
fn client_list_stacking_mirrors_the_stacking_order() {
    let conn = ScriptedConn::new()
        .with_class(1, "term", "Term")
        .with_class(2, "other", "Other");
    let mut state = State::try_new(Config::default(), &conn).unwrap();
    let root = state.root;

    for id in 1u32..=2 {
        manage::manage_window(&mut state, &conn, Xid::from(id), quay::autoprops::ApplyOn::NEW)
            .unwrap();
    }

    let fids: Vec<_> = state.frames.keys().copied().collect();
    state.raise_frame(&conn, fids[0]).unwrap();

    // the published list names client windows bottom-to-top in the same
    // order as the internal stacking of their frames
    let expected: Vec<Xid> = state
        .stacking
        .ids()
        .iter()
        .filter_map(|w| {
            state
                .frames
                .values()
                .find(|f| f.window == *w)
                .and_then(|f| f.active_client())
        })
        .collect();

    match conn.written_prop(root, Atom::NetClientListStacking.as_ref()) {
        Some(Prop::Window(ids)) => assert_eq!(ids, expected),
        other => panic!("unexpected stacking list: {other:?}"),
    }
}

#[test]
fn stacking_stays_layer_sorted_through_churn() {
    let conn = ScriptedConn::new()
        .with_class(1, "term", "Term")
        .with_class(2, "other", "Other")
        .with_class(3, "third", "Third");
    let mut state = State::try_new(Config::default(), &conn).unwrap();

    for id in 1u32..=3 {
        manage::manage_window(&mut state, &conn, Xid::from(id), quay::autoprops::ApplyOn::NEW)
            .unwrap();
    }
    assert_eq!(state.frames.len(), 3);
    assert!(state.stacking.is_layer_sorted());

    let fids: Vec<_> = state.frames.keys().copied().collect();
    for fid in fids {
        state.raise_frame(&conn, fid).unwrap();
        assert!(state.stacking.is_layer_sorted());
        state.lower_frame(&conn, fid).unwrap();
        assert!(state.stacking.is_layer_sorted());
    }
}
