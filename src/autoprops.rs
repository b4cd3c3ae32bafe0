//! The AutoProperties rule engine.
//!
//! Declarative property sets bound to incoming windows by
//! `(name, class, role, title)` regex tuples, apply-phase masks and optional
//! workspace lists. The configuration parser is an external collaborator:
//! this module consumes already-parsed rules and answers match queries.
use crate::{
    client::{CfgDeny, Opacity, SkipFlags, WmActions},
    pure::{geometry::Rect, placement::PlacementModel, Layer},
    x::Atom,
    Error, Result,
};
use bitflags::bitflags;
use regex::Regex;
use std::collections::HashMap;

/// The identifying tuple read from a window, matched against rule regexes.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ClassHint {
    /// Name part of the WM_CLASS hint
    pub name: String,
    /// Class part of the WM_CLASS hint
    pub class: String,
    /// WM_WINDOW_ROLE value
    pub role: String,
    /// Current window title
    pub title: String,
    /// Group the window belongs to (from a matched group rule)
    pub group: String,
}

impl ClassHint {
    /// Create a hint from the name and class parts of WM_CLASS.
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            ..Default::default()
        }
    }
}

bitflags! {
    /// The phases at which a rule fires.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ApplyOn: u8 {
        /// During the initial scan of existing windows
        const START = 1 << 0;
        /// When a new client is managed
        const NEW = 1 << 1;
        /// When the rule set is reloaded
        const RELOAD = 1 << 2;
        /// When a client changes workspace
        const WORKSPACE = 1 << 3;
        /// When a transient client is managed
        const TRANSIENT = 1 << 4;
        /// Only ever applied to transient clients
        const TRANSIENT_ONLY = 1 << 5;
    }
}

impl Default for ApplyOn {
    fn default() -> Self {
        ApplyOn::START | ApplyOn::NEW
    }
}

/// The regex tuple and applicability filters shared by every rule kind.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    /// Matches the name part of WM_CLASS; `None` matches everything
    pub name: Option<Regex>,
    /// Matches the class part of WM_CLASS; `None` matches everything
    pub class: Option<Regex>,
    /// Matches WM_WINDOW_ROLE when set
    pub role: Option<Regex>,
    /// Matches the window title when set
    pub title: Option<Regex>,
    /// Phases at which the owning rule fires
    pub apply_on: ApplyOn,
    /// When non-empty, only these workspaces are eligible
    pub workspaces: Vec<usize>,
}

impl Matcher {
    /// A matcher over the class part of WM_CLASS firing at the default
    /// phases.
    pub fn for_class(class: &str) -> Result<Self> {
        Ok(Self {
            class: Some(Regex::new(class)?),
            apply_on: ApplyOn::default(),
            ..Default::default()
        })
    }

    /// A matcher over both parts of WM_CLASS.
    pub fn for_name_class(name: &str, class: &str) -> Result<Self> {
        Ok(Self {
            name: Some(Regex::new(name)?),
            class: Some(Regex::new(class)?),
            apply_on: ApplyOn::default(),
            ..Default::default()
        })
    }

    /// Restrict this matcher to the given phases.
    pub fn on(mut self, apply_on: ApplyOn) -> Self {
        self.apply_on = apply_on;
        self
    }

    /// Restrict this matcher to the given workspaces.
    pub fn on_workspaces(mut self, workspaces: Vec<usize>) -> Self {
        self.workspaces = workspaces;
        self
    }

    /// Whether the regex tuple matches `hint`.
    pub fn matches(&self, hint: &ClassHint) -> bool {
        let m = |re: &Option<Regex>, s: &str| re.as_ref().map(|re| re.is_match(s)).unwrap_or(true);

        m(&self.name, &hint.name)
            && m(&self.class, &hint.class)
            && m(&self.role, &hint.role)
            && m(&self.title, &hint.title)
    }

    /// Whether this matcher applies to `hint` on workspace `ws` in `phase`.
    pub fn applies(&self, hint: &ClassHint, ws: Option<usize>, phase: ApplyOn) -> bool {
        if !self.apply_on.intersects(phase) {
            return false;
        }

        // TRANSIENT_ONLY rules never fire for non-transient clients
        if self.apply_on.contains(ApplyOn::TRANSIENT_ONLY)
            && !phase.contains(ApplyOn::TRANSIENT)
        {
            return false;
        }

        if !self.workspaces.is_empty() {
            match ws {
                Some(ws) if self.workspaces.contains(&ws) => (),
                _ => return false,
            }
        }

        self.matches(hint)
    }
}

/// Grouping parameters carried by an [AutoProperty].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    /// Name of the group; candidates must share it
    pub name: String,
    /// Maximum clients per frame, 0 = unbounded
    pub size: usize,
    /// Place a newly created frame behind the current focus
    pub behind: bool,
    /// Try the focused client's frame before scanning
    pub focused_first: bool,
    /// Group across workspaces and iconified frames
    pub global: bool,
    /// Raise the frame when a client joins it
    pub raise: bool,
}

/// A standard auto property rule: the matcher plus the payload applied to
/// matching clients. Every payload field is optional; only set fields are
/// applied, which is also what lets an explicit rule override a window-type
/// default per property.
#[derive(Debug, Clone, Default)]
pub struct AutoProperty {
    /// When this rule fires
    pub matcher: Matcher,

    /// Frame geometry to apply
    pub frame_geometry: Option<Rect>,
    /// Client geometry to apply
    pub client_geometry: Option<Rect>,
    /// Visible on all workspaces
    pub sticky: Option<bool>,
    /// Rolled up to the titlebar
    pub shaded: Option<bool>,
    /// Start iconified
    pub iconified: Option<bool>,
    /// Maximized vertically
    pub maximized_vert: Option<bool>,
    /// Maximized horizontally
    pub maximized_horz: Option<bool>,
    /// Fullscreen
    pub fullscreen: Option<bool>,
    /// Draw a border
    pub border: Option<bool>,
    /// Draw a titlebar
    pub titlebar: Option<bool>,
    /// Accepts focus
    pub focusable: Option<bool>,
    /// Focus the client when first mapped
    pub focus_new: Option<bool>,
    /// Run placement when first mapped
    pub place_new: Option<bool>,
    /// Workspace to start on
    pub workspace: Option<usize>,
    /// Surfaces to skip
    pub skip: Option<SkipFlags>,
    /// Requests to deny
    pub cfg_deny: Option<CfgDeny>,
    /// Stacking layer
    pub layer: Option<Layer>,
    /// Focused / unfocused opacity
    pub opacity: Option<Opacity>,
    /// Actions to allow
    pub allowed_actions: Option<WmActions>,
    /// Actions to deny
    pub disallowed_actions: Option<WmActions>,
    /// Decor profile name
    pub decor: Option<String>,
    /// Icon asset name
    pub icon: Option<String>,
    /// Placement strategy override
    pub placement: Option<Vec<PlacementModel>>,
    /// Grouping parameters
    pub group: Option<Group>,
}

impl AutoProperty {
    /// A rule with the given matcher and an empty payload.
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher,
            ..Default::default()
        }
    }

    /// Merge `other` underneath this rule: fields this rule does not set are
    /// taken from `other`. Used to let explicit rules win over window-type
    /// defaults per property.
    pub fn or_defaults(&self, other: &AutoProperty) -> AutoProperty {
        macro_rules! pick {
            ($field:ident) => {
                self.$field.clone().or_else(|| other.$field.clone())
            };
        }

        AutoProperty {
            matcher: self.matcher.clone(),
            frame_geometry: pick!(frame_geometry),
            client_geometry: pick!(client_geometry),
            sticky: pick!(sticky),
            shaded: pick!(shaded),
            iconified: pick!(iconified),
            maximized_vert: pick!(maximized_vert),
            maximized_horz: pick!(maximized_horz),
            fullscreen: pick!(fullscreen),
            border: pick!(border),
            titlebar: pick!(titlebar),
            focusable: pick!(focusable),
            focus_new: pick!(focus_new),
            place_new: pick!(place_new),
            workspace: pick!(workspace),
            skip: pick!(skip),
            cfg_deny: pick!(cfg_deny),
            layer: pick!(layer),
            opacity: pick!(opacity),
            allowed_actions: pick!(allowed_actions),
            disallowed_actions: pick!(disallowed_actions),
            decor: pick!(decor),
            icon: pick!(icon),
            placement: pick!(placement),
            group: pick!(group),
        }
    }
}

/// A compiled `s/pattern/replacement/flags` title rewrite.
#[derive(Debug, Clone)]
pub struct TitleRule {
    regex: Regex,
    replacement: String,
    global: bool,
}

impl TitleRule {
    /// Parse a rewrite rule of the form `s/pattern/replacement/flags`.
    ///
    /// The separator is the character following `s`. Supported flags are
    /// `g` (replace all) and `i` (case insensitive).
    pub fn parse(rule: &str) -> Result<Self> {
        let mut chars = rule.chars();
        if chars.next() != Some('s') {
            return Err(Error::InvalidTitleRule(rule.into()));
        }
        let sep = chars
            .next()
            .ok_or_else(|| Error::InvalidTitleRule(rule.into()))?;

        let rest: String = chars.collect();
        let parts: Vec<&str> = rest.splitn(3, sep).collect();
        if parts.len() < 2 {
            return Err(Error::InvalidTitleRule(rule.into()));
        }

        let flags = parts.get(2).copied().unwrap_or("");
        let pattern = if flags.contains('i') {
            format!("(?i){}", parts[0])
        } else {
            parts[0].to_string()
        };

        Ok(Self {
            regex: Regex::new(&pattern)?,
            replacement: parts[1].to_string(),
            global: flags.contains('g'),
        })
    }

    /// Apply the rewrite, returning `None` when the pattern does not match.
    pub fn rewrite(&self, title: &str) -> Option<String> {
        if !self.regex.is_match(title) {
            return None;
        }

        let rewritten = if self.global {
            self.regex.replace_all(title, self.replacement.as_str())
        } else {
            self.regex.replace(title, self.replacement.as_str())
        };

        Some(rewritten.into_owned())
    }
}

/// A title rewrite rule.
#[derive(Debug, Clone)]
pub struct TitleProperty {
    /// When this rule fires
    pub matcher: Matcher,
    /// The rewrite to apply to the displayed title
    pub rule: TitleRule,
}

/// A decoration override rule.
#[derive(Debug, Clone)]
pub struct DecorProperty {
    /// When this rule fires
    pub matcher: Matcher,
    /// Name of the decor profile to use
    pub decor: String,
}

/// A dock-app rule used by the Harbour's sort order.
#[derive(Debug, Clone)]
pub struct DockAppProperty {
    /// When this rule fires
    pub matcher: Matcher,
    /// Signed sort position: positives lead, zeros fill the middle,
    /// negatives trail
    pub position: i32,
}

/// The parsed, indexed rule set.
///
/// Rule lists are matched in declaration order; the first applicable rule
/// wins. Reload swaps the whole value atomically at the owner.
#[derive(Debug, Clone, Default)]
pub struct AutoProperties {
    props: Vec<AutoProperty>,
    title_props: Vec<TitleProperty>,
    decor_props: Vec<DecorProperty>,
    dock_app_props: Vec<DockAppProperty>,
    type_props: HashMap<Atom, AutoProperty>,
    harbour_sort: bool,
}

impl AutoProperties {
    /// Build a rule set from parsed rule lists.
    ///
    /// Window-type rules not present in `type_props` fall back to the
    /// built-in defaults. Harbour sorting is enabled when any dock-app rule
    /// carries a non-zero position.
    pub fn new(
        props: Vec<AutoProperty>,
        title_props: Vec<TitleProperty>,
        decor_props: Vec<DecorProperty>,
        dock_app_props: Vec<DockAppProperty>,
        type_props: HashMap<Atom, AutoProperty>,
    ) -> Self {
        let harbour_sort = dock_app_props.iter().any(|p| p.position != 0);

        let mut defaults = default_type_properties();
        defaults.extend(type_props);

        Self {
            props,
            title_props,
            decor_props,
            dock_app_props,
            type_props: defaults,
            harbour_sort,
        }
    }

    /// The first standard rule applicable to `hint` on `ws` in `phase`.
    pub fn find_auto_property(
        &self,
        hint: &ClassHint,
        ws: Option<usize>,
        phase: ApplyOn,
    ) -> Option<&AutoProperty> {
        self.props
            .iter()
            .find(|p| p.matcher.applies(hint, ws, phase))
    }

    /// The first matching title rewrite rule.
    pub fn find_title_property(&self, hint: &ClassHint) -> Option<&TitleProperty> {
        self.title_props.iter().find(|p| p.matcher.matches(hint))
    }

    /// The first matching decoration override.
    pub fn find_decor_property(&self, hint: &ClassHint) -> Option<&DecorProperty> {
        self.decor_props.iter().find(|p| p.matcher.matches(hint))
    }

    /// The first matching dock-app rule.
    pub fn find_dock_app_property(&self, hint: &ClassHint) -> Option<&DockAppProperty> {
        self.dock_app_props.iter().find(|p| p.matcher.matches(hint))
    }

    /// The defaults for an EWMH window type, looked up by atom rather than
    /// by regex.
    pub fn find_window_type_property(&self, atom: Atom) -> Option<&AutoProperty> {
        self.type_props.get(&atom)
    }

    /// Whether dock apps are placed in sorted order.
    pub fn is_harbour_sort(&self) -> bool {
        self.harbour_sort
    }

    /// Drop the START bit from every rule.
    ///
    /// Called once the initial window scan completes so that rules meant for
    /// startup only never fire on later matches.
    pub fn remove_apply_on_start(&mut self) {
        for p in self.props.iter_mut() {
            p.matcher.apply_on.remove(ApplyOn::START);
        }
    }
}

/// The built-in window-type defaults installed when no explicit type rule is
/// configured.
pub fn default_type_properties() -> HashMap<Atom, AutoProperty> {
    let mut m = HashMap::new();

    let base_skip =
        SkipFlags::MENUS | SkipFlags::FOCUS_TOGGLE | SkipFlags::SNAP | SkipFlags::TASKBAR;

    let mut desktop = AutoProperty::default();
    desktop.sticky = Some(true);
    desktop.border = Some(false);
    desktop.titlebar = Some(false);
    desktop.skip = Some(base_skip | SkipFlags::PAGER);
    desktop.layer = Some(Layer::Desktop);
    desktop.client_geometry = Some(Rect::new(0, 0, 0, 0));
    m.insert(Atom::NetWindowTypeDesktop, desktop);

    let mut dock = AutoProperty::default();
    dock.sticky = Some(true);
    dock.border = Some(false);
    dock.titlebar = Some(false);
    dock.layer = Some(Layer::Dock);
    m.insert(Atom::NetWindowTypeDock, dock);

    let mut toolbar = AutoProperty::default();
    toolbar.border = Some(true);
    toolbar.titlebar = Some(true);
    toolbar.skip =
        Some(SkipFlags::MENUS | SkipFlags::FOCUS_TOGGLE | SkipFlags::PAGER | SkipFlags::TASKBAR);
    m.insert(Atom::NetWindowTypeToolbar, toolbar);

    let mut menu = AutoProperty::default();
    menu.border = Some(false);
    menu.titlebar = Some(false);
    menu.skip = Some(base_skip);
    m.insert(Atom::NetWindowTypeMenu, menu);

    let mut utility = AutoProperty::default();
    utility.border = Some(true);
    utility.titlebar = Some(true);
    utility.skip = Some(SkipFlags::MENUS | SkipFlags::FOCUS_TOGGLE | SkipFlags::SNAP);
    m.insert(Atom::NetWindowTypeUtility, utility);

    let mut splash = AutoProperty::default();
    splash.border = Some(false);
    splash.titlebar = Some(false);
    m.insert(Atom::NetWindowTypeSplash, splash);

    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn hint(name: &str, class: &str) -> ClassHint {
        ClassHint::new(name, class)
    }

    fn rule_for_class(class: &str) -> AutoProperty {
        AutoProperty::new(Matcher::for_class(class).unwrap())
    }

    fn store(props: Vec<AutoProperty>) -> AutoProperties {
        AutoProperties::new(props, vec![], vec![], vec![], HashMap::new())
    }

    #[test]
    fn first_match_in_declaration_order_wins() {
        let mut first = rule_for_class("Term");
        first.workspace = Some(1);
        let mut second = rule_for_class("Term");
        second.workspace = Some(2);

        let ap = store(vec![first, second]);
        let found = ap
            .find_auto_property(&hint("x", "Term"), None, ApplyOn::NEW)
            .unwrap();

        assert_eq!(found.workspace, Some(1));
    }

    #[test_case(ApplyOn::NEW, true; "matching phase")]
    #[test_case(ApplyOn::RELOAD, false; "non matching phase")]
    #[test]
    fn phase_mask_gates_matching(phase: ApplyOn, expected: bool) {
        let ap = store(vec![rule_for_class("Term")]);

        let got = ap.find_auto_property(&hint("x", "Term"), None, phase);
        assert_eq!(got.is_some(), expected);
    }

    #[test]
    fn workspace_list_gates_matching() {
        let rule = AutoProperty::new(
            Matcher::for_class("Term")
                .unwrap()
                .on_workspaces(vec![1, 3]),
        );
        let ap = store(vec![rule]);
        let h = hint("x", "Term");

        assert!(ap.find_auto_property(&h, Some(1), ApplyOn::NEW).is_some());
        assert!(ap.find_auto_property(&h, Some(2), ApplyOn::NEW).is_none());
        // a rule with a workspace list needs a workspace to match against
        assert!(ap.find_auto_property(&h, None, ApplyOn::NEW).is_none());
    }

    #[test]
    fn transient_only_rules_need_a_transient_phase() {
        let matcher = Matcher::for_class("Term")
            .unwrap()
            .on(ApplyOn::NEW | ApplyOn::TRANSIENT_ONLY);
        let ap = store(vec![AutoProperty::new(matcher)]);
        let h = hint("x", "Term");

        assert!(ap.find_auto_property(&h, None, ApplyOn::NEW).is_none());
        assert!(ap
            .find_auto_property(&h, None, ApplyOn::NEW | ApplyOn::TRANSIENT)
            .is_some());
    }

    #[test]
    fn role_and_title_regexes_must_match_when_set() {
        let mut matcher = Matcher::for_class(".*").unwrap();
        matcher.role = Some(Regex::new("browser").unwrap());

        let mut h = hint("x", "Firefox");
        assert!(!matcher.matches(&h));

        h.role = "browser-window".into();
        assert!(matcher.matches(&h));
    }

    #[test_case("s/foo/bar/", "a foo foo", Some("a bar foo"); "first only")]
    #[test_case("s/foo/bar/g", "a foo foo", Some("a bar bar"); "global")]
    #[test_case("s/FOO/bar/i", "a foo", Some("a bar"); "case insensitive")]
    #[test_case("s/xyz/bar/", "a foo", None; "no match")]
    #[test_case("s|/|-|g", "a/b/c", Some("a-b-c"); "alternate separator")]
    #[test]
    fn title_rewrite(rule: &str, title: &str, expected: Option<&str>) {
        let rule = TitleRule::parse(rule).unwrap();

        assert_eq!(rule.rewrite(title).as_deref(), expected);
    }

    #[test]
    fn title_rule_group_references() {
        let rule = TitleRule::parse(r"s/(\w+) - Editor/$1/").unwrap();

        assert_eq!(rule.rewrite("notes - Editor").as_deref(), Some("notes"));
    }

    #[test_case("foo"; "missing leading s")]
    #[test_case("s/only-pattern"; "missing replacement")]
    #[test]
    fn invalid_title_rules_are_rejected(raw: &str) {
        assert!(TitleRule::parse(raw).is_err());
    }

    #[test]
    fn desktop_type_defaults() {
        let ap = store(vec![]);
        let p = ap
            .find_window_type_property(Atom::NetWindowTypeDesktop)
            .unwrap();

        assert_eq!(p.sticky, Some(true));
        assert_eq!(p.border, Some(false));
        assert_eq!(p.titlebar, Some(false));
        assert_eq!(p.layer, Some(Layer::Desktop));
        assert_eq!(p.client_geometry, Some(Rect::new(0, 0, 0, 0)));
        assert!(p.skip.unwrap().contains(SkipFlags::PAGER));
    }

    #[test]
    fn menu_skip_is_desktop_minus_pager() {
        let ap = store(vec![]);
        let desktop = ap
            .find_window_type_property(Atom::NetWindowTypeDesktop)
            .unwrap()
            .skip
            .unwrap();
        let menu = ap
            .find_window_type_property(Atom::NetWindowTypeMenu)
            .unwrap()
            .skip
            .unwrap();

        assert_eq!(menu, desktop - SkipFlags::PAGER);
    }

    #[test]
    fn explicit_rule_beats_type_rule_per_property() {
        let mut explicit = rule_for_class("Panel");
        explicit.layer = Some(Layer::OnTop);

        let ap = store(vec![explicit]);
        let type_rule = ap
            .find_window_type_property(Atom::NetWindowTypeDock)
            .unwrap()
            .clone();
        let rule = ap
            .find_auto_property(&hint("x", "Panel"), None, ApplyOn::NEW)
            .unwrap();

        let merged = rule.or_defaults(&type_rule);

        // explicit layer wins, unset sticky falls back to the dock default
        assert_eq!(merged.layer, Some(Layer::OnTop));
        assert_eq!(merged.sticky, Some(true));
    }

    #[test]
    fn harbour_sort_requires_a_position() {
        let unsorted = AutoProperties::new(
            vec![],
            vec![],
            vec![],
            vec![DockAppProperty {
                matcher: Matcher::for_class("wmclock").unwrap(),
                position: 0,
            }],
            HashMap::new(),
        );
        assert!(!unsorted.is_harbour_sort());

        let sorted = AutoProperties::new(
            vec![],
            vec![],
            vec![],
            vec![DockAppProperty {
                matcher: Matcher::for_class("wmclock").unwrap(),
                position: -1,
            }],
            HashMap::new(),
        );
        assert!(sorted.is_harbour_sort());
    }

    #[test]
    fn remove_apply_on_start_drops_start_only_rules() {
        let rule = AutoProperty::new(Matcher::for_class("Term").unwrap().on(ApplyOn::START));
        let mut ap = store(vec![rule]);
        let h = hint("x", "Term");

        assert!(ap.find_auto_property(&h, None, ApplyOn::START).is_some());

        ap.remove_apply_on_start();

        assert!(ap.find_auto_property(&h, None, ApplyOn::START).is_none());
    }
}
