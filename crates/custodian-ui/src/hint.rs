use crate::surface::HintView;

pub const PRIMARY_HINT: &str = "CLICK THE INPUT LINE TO FOCUS";
pub const SECONDARY_HINT: &str = "TYPE HELP FOR AVAILABLE DIRECTIVES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintState {
    /// A command was submitted this session; hints never return.
    Locked,
    IdlePrimary,
    FocusedPrimary,
    FocusedSecondary,
}

/// What the owner should do with the escalation timer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintTimer {
    Start,
    Cancel,
    Keep,
}

#[derive(Debug, Clone)]
pub struct HintMachine {
    state: HintState,
    visible: bool,
    focused: bool,
    intent: bool,
}

impl Default for HintMachine {
    fn default() -> Self {
        Self {
            state: HintState::IdlePrimary,
            visible: false,
            focused: false,
            intent: false,
        }
    }
}

impl HintMachine {
    pub fn state(&self) -> HintState {
        self.state
    }

    /// Input became enabled: re-prime the idle hint unless locked.
    pub fn on_enabled(&mut self) -> HintTimer {
        if self.state == HintState::Locked {
            return HintTimer::Cancel;
        }
        self.state = HintState::IdlePrimary;
        self.visible = true;
        self.intent = false;
        self.try_focus()
    }

    pub fn on_disabled(&mut self) -> HintTimer {
        self.visible = false;
        HintTimer::Cancel
    }

    /// A deliberate press on the input line.
    pub fn on_focus_intent(&mut self) -> HintTimer {
        self.intent = true;
        self.try_focus()
    }

    pub fn on_focus_changed(&mut self, focused: bool) -> HintTimer {
        self.focused = focused;
        if focused {
            return self.try_focus();
        }
        self.intent = false;
        if matches!(
            self.state,
            HintState::FocusedPrimary | HintState::FocusedSecondary
        ) {
            self.state = HintState::IdlePrimary;
        }
        HintTimer::Cancel
    }

    /// The escalation timer fired.
    pub fn escalate(&mut self, input_empty: bool) -> bool {
        if self.state == HintState::FocusedPrimary && self.visible && self.focused && input_empty {
            self.state = HintState::FocusedSecondary;
            return true;
        }
        false
    }

    /// First submission of the session.
    pub fn lock(&mut self) -> HintTimer {
        self.state = HintState::Locked;
        self.visible = false;
        HintTimer::Cancel
    }

    pub fn view(&self) -> Option<HintView> {
        if !self.visible {
            return None;
        }
        match self.state {
            HintState::Locked => None,
            HintState::IdlePrimary => Some(HintView {
                primary: PRIMARY_HINT,
                secondary: None,
                faded: false,
            }),
            HintState::FocusedPrimary => Some(HintView {
                primary: PRIMARY_HINT,
                secondary: None,
                faded: true,
            }),
            HintState::FocusedSecondary => Some(HintView {
                primary: PRIMARY_HINT,
                secondary: Some(SECONDARY_HINT),
                faded: true,
            }),
        }
    }

    fn try_focus(&mut self) -> HintTimer {
        if self.state == HintState::IdlePrimary && self.visible && self.focused && self.intent {
            self.state = HintState::FocusedPrimary;
            return HintTimer::Start;
        }
        HintTimer::Keep
    }
}
