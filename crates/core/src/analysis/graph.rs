use crate::{
    audio::{Playable, Slot, SLOT_COUNT},
    config::AnalyserConfig,
    Result,
};

use super::Analyser;

/// Connection from one loaded track into the shared analyser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceNode {
    id: u64,
    slot: Slot,
}

impl SourceNode {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Routing of every loaded track through a single analyser and on to the
/// output.
///
/// The analyser is built on the first connection and reused afterwards. Each
/// slot holds at most one live [`SourceNode`]; connecting a slot again
/// replaces its previous node.
#[derive(Debug)]
pub struct AnalysisGraph {
    config: AnalyserConfig,
    analyser: Option<Analyser>,
    connections: [Option<SourceNode>; SLOT_COUNT],
    next_id: u64,
    mix: Vec<f32>,
    scratch: Vec<f32>,
}

impl AnalysisGraph {
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            config,
            analyser: None,
            connections: [None; SLOT_COUNT],
            next_id: 0,
            mix: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Creates the source node for a freshly loaded track in `slot`.
    pub fn connect(&mut self, slot: Slot) -> Result<SourceNode> {
        if self.analyser.is_none() {
            let analyser = Analyser::new(self.config.clone())?;
            self.mix = vec![0.0; self.config.fft_size];
            self.scratch = vec![0.0; self.config.fft_size];
            self.analyser = Some(analyser);
            tracing::debug!(fft_size = self.config.fft_size, "created analyser");
        }

        let node = SourceNode {
            id: self.next_id,
            slot,
        };
        self.next_id += 1;

        if let Some(previous) = self.connections[slot.index()].replace(node) {
            tracing::debug!(%slot, old = previous.id, new = node.id, "replaced source node");
        }
        Ok(node)
    }

    pub fn is_connected(&self, node: SourceNode) -> bool {
        self.connections[node.slot.index()] == Some(node)
    }

    pub fn analyser(&self) -> Option<&Analyser> {
        self.analyser.as_ref()
    }

    /// Mixes the current output of every connected source into the analyser.
    ///
    /// Returns `false` when nothing has been connected yet.
    pub fn pump<'a, I>(&mut self, sources: I) -> Result<bool>
    where
        I: IntoIterator<Item = (SourceNode, &'a dyn Playable)>,
    {
        let Some(analyser) = self.analyser.as_mut() else {
            return Ok(false);
        };

        self.mix.fill(0.0);
        for (node, handle) in sources {
            if self.connections[node.slot.index()] != Some(node) {
                continue;
            }
            handle.fill_output(&mut self.scratch);
            for (mixed, sample) in self.mix.iter_mut().zip(&self.scratch) {
                *mixed += sample;
            }
        }

        analyser.process(&self.mix)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::AnalysisSource, audio::MediaTrack};

    fn small_config() -> AnalyserConfig {
        AnalyserConfig {
            fft_size: 32,
            ..Default::default()
        }
    }

    #[test]
    fn analyser_is_created_once() {
        let mut graph = AnalysisGraph::new(small_config());
        assert!(graph.analyser().is_none());

        let a = graph.connect(Slot::A).unwrap();
        let b = graph.connect(Slot::B).unwrap();

        assert!(graph.analyser().is_some());
        assert_ne!(a.id(), b.id());
        assert!(graph.is_connected(a));
        assert!(graph.is_connected(b));
    }

    #[test]
    fn reconnecting_a_slot_replaces_its_node() {
        let mut graph = AnalysisGraph::new(small_config());
        let first = graph.connect(Slot::A).unwrap();
        let second = graph.connect(Slot::A).unwrap();

        assert!(!graph.is_connected(first));
        assert!(graph.is_connected(second));
    }

    #[test]
    fn pump_without_connections_is_a_no_op() {
        let mut graph = AnalysisGraph::new(small_config());
        assert!(!graph.pump(std::iter::empty::<(SourceNode, &dyn Playable)>()).unwrap());
    }

    #[test]
    fn pump_ignores_stale_nodes() {
        let mut graph = AnalysisGraph::new(small_config());
        let stale = graph.connect(Slot::A).unwrap();
        graph.connect(Slot::A).unwrap();

        let mut loud = MediaTrack::from_samples(vec![0.5; 64], 32).unwrap();
        loud.play();
        loud.set_position(1.5);

        assert!(graph.pump([(stale, &loud as &dyn Playable)]).unwrap());

        let mut out = [0_u8; 16];
        graph.analyser().unwrap().time_domain_data(&mut out);
        assert!(out.iter().all(|&b| b == 128));
    }

    #[test]
    fn pump_feeds_playing_output() {
        let mut graph = AnalysisGraph::new(small_config());
        let node = graph.connect(Slot::B).unwrap();

        let mut track = MediaTrack::from_samples(vec![0.5; 64], 32).unwrap();
        track.play();
        track.set_position(1.5);

        graph.pump([(node, &track as &dyn Playable)]).unwrap();

        let mut out = [0_u8; 16];
        graph.analyser().unwrap().time_domain_data(&mut out);
        assert!(out.iter().all(|&b| b == 192));
    }
}
